//! # FinMind 資料採集模組
//!
//! 透過 FinMind v4 REST API 取得個股日線、三大法人、融資融券、
//! 借券賣出與券商分點資料。
//!
//! - 來源域名：`api.finmindtrade.com`
//! - 存取方式：HTTP GET，帶 `Authorization: Bearer <token>` 可提高額度
//! - 分點日報 (`trading_daily_report`) 僅 sponsor 會員可用，必須有 token

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{self, HeaderValue};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    crawler::StockChips,
    fetcher::record::{BrokerFlow, DailyBar, InstitutionalFlow, MarginBalance, SblActivity},
    util,
};

/// 個股三大法人買賣超
pub mod institutional;
/// 個股融資融券
pub mod margin;
/// 個股日線
pub mod price;
/// 借券賣出餘額
pub mod short_sale_balance;
/// 券商分點日報
pub mod trading_daily_report;

/// FinMind API 主機域名
const HOST: &str = "api.finmindtrade.com";

/// FinMind 共用的回應外殼
#[derive(Deserialize, Debug)]
struct Response<T> {
    msg: Option<String>,
    status: Option<i32>,
    data: Option<Vec<T>>,
}

/// FinMind 採集器，`token` 為 None 時只查詢公開資料集
pub struct FinMind {
    token: Option<String>,
}

impl FinMind {
    pub fn new(token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        FinMind { token }
    }
}

#[async_trait]
impl StockChips for FinMind {
    async fn daily_bars(
        &self,
        stock_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>> {
        price::visit(stock_symbol, start, end, self.token.as_deref()).await
    }

    async fn institutional(
        &self,
        stock_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<InstitutionalFlow>> {
        institutional::visit(stock_symbol, start, end, self.token.as_deref()).await
    }

    async fn margins(
        &self,
        stock_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MarginBalance>> {
        margin::visit(stock_symbol, start, end, self.token.as_deref()).await
    }

    async fn short_sale_balances(
        &self,
        stock_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SblActivity>> {
        short_sale_balance::visit(stock_symbol, start, end, self.token.as_deref()).await
    }

    fn has_broker_access(&self) -> bool {
        self.token.is_some()
    }

    async fn broker_flows(&self, stock_symbol: &str, date: NaiveDate) -> Result<Vec<BrokerFlow>> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("FINMIND_TOKEN is not set"))?;
        trading_daily_report::visit(stock_symbol, date, token).await
    }
}

/// 建立帶 token 的請求標頭，token 為空時回傳錯誤
pub fn build_headers(token: &str) -> Result<header::HeaderMap> {
    let token = token.trim();
    if token.is_empty() {
        return Err(anyhow!("FINMIND_TOKEN is not set"));
    }

    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token))?,
    );

    Ok(headers)
}

/// 有 token 才帶標頭，公開資料集沒有 token 也能查詢
fn optional_headers(token: Option<&str>) -> Result<Option<header::HeaderMap>> {
    match token {
        Some(t) if !t.trim().is_empty() => Ok(Some(build_headers(t)?)),
        _ => Ok(None),
    }
}

/// 查詢 `/api/v4/data` 上的資料集
async fn fetch_dataset<T: DeserializeOwned>(
    dataset: &str,
    stock_symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    token: Option<&str>,
) -> Result<Vec<T>> {
    let url = format!(
        "https://{host}/api/v4/data?dataset={dataset}&data_id={symbol}&start_date={start}&end_date={end}",
        host = HOST,
        dataset = dataset,
        symbol = urlencoding::encode(stock_symbol),
        start = start.format("%Y-%m-%d"),
        end = end.format("%Y-%m-%d"),
    );

    let res = util::http::get_json::<Response<T>>(&url, optional_headers(token)?).await?;
    unwrap_response(dataset, res)
}

/// `msg` 不是 success 時視為失敗，例如額度用盡或 token 無效
fn unwrap_response<T>(dataset: &str, res: Response<T>) -> Result<Vec<T>> {
    let msg = res.msg.unwrap_or_default();
    if !msg.eq_ignore_ascii_case("success") {
        return Err(anyhow!(
            "FinMind {} responded status {:?}: {}",
            dataset,
            res.status,
            msg
        ));
    }

    Ok(res.data.unwrap_or_default())
}
