//! # 臺灣證券交易所資料採集模組
//!
//! - 來源域名：`www.twse.com.tw`
//! - 回應格式：JSON，`stat` 為 `OK` 才有資料；休市日回傳「很抱歉，沒有符合條件的資料!」

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

use crate::{logging, util};

/// 三大法人買賣金額統計
pub mod institutional_investors;
/// 信用交易統計
pub mod margin_trading;
/// 台股加權指數
pub mod taiwan_capitalization_weighted_stock_index;

const HOST: &str = "www.twse.com.tw";

/// rwd 介面把多個表格放在 `tables`
#[derive(Deserialize, Debug, Default, Clone)]
struct Table {
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

/// TWSE 共用的回應格式
#[derive(Deserialize, Debug, Default, Clone)]
struct Response {
    stat: Option<String>,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
    #[serde(default)]
    tables: Vec<Table>,
}

impl Response {
    fn is_ok(&self) -> bool {
        self.stat
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("OK"))
    }
}

/// 取得 TWSE 的 JSON，`stat` 不是 OK（多半是休市）時回傳 None
async fn fetch(path_and_query: &str) -> Result<Option<Response>> {
    let url = format!("https://{}{}", HOST, path_and_query);
    let res = util::http::get_json::<Response>(&url, None).await?;

    if !res.is_ok() {
        logging::info_file_async(format!(
            "{} has no data: {}",
            url,
            res.stat.as_deref().unwrap_or_default()
        ));
        return Ok(None);
    }

    Ok(Some(res))
}

/// 儲存格可能是字串或數字，一律轉成字串
fn cell(row: &[Value], index: usize) -> String {
    match row.get(index) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// 依欄位名稱找索引，找不到時使用預設位置
fn field_index(fields: &[String], keyword: &str, fallback: usize) -> usize {
    fields
        .iter()
        .position(|f| f.contains(keyword))
        .unwrap_or(fallback)
}
