//! # 臺灣期貨交易所資料採集模組
//!
//! - 來源域名：`www.taifex.com.tw`
//! - 日期參數格式為 `YYYY/MM/DD`
//! - 下載類 (`*Down`) 介面回傳 Big5 編碼的 csv

use chrono::NaiveDate;

/// 三大法人期貨未平倉
pub mod futures_open_interest;
/// 選擇權買賣權比
pub mod put_call_ratio;

const HOST: &str = "www.taifex.com.tw";

fn query_date(date: NaiveDate) -> String {
    date.format("%Y/%m/%d").to_string()
}
