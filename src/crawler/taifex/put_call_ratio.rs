use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use reqwest::header::{self, HeaderMap};

use crate::{
    crawler::taifex::{self, HOST},
    util::{self, datetime, http::TextForceBig5, text},
};

const OPEN_INTEREST_RATIO: &str = "買賣權未平倉量比率";

/// 每日買賣權未平倉量比率 (%)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PutCallRatio {
    pub date: NaiveDate,
    pub ratio: f64,
}

/// 下載 `start`~`end` 的 P/C ratio，依日期由舊到新排序
pub async fn visit(start: NaiveDate, end: NaiveDate) -> Result<Vec<PutCallRatio>> {
    let url = format!("https://{}/cht/3/pcRatioDown", HOST);
    let mut headers = HeaderMap::new();
    headers.insert(header::REFERER, format!("https://{}/cht/3/pcRatio", HOST).parse()?);

    let params = [
        ("queryStartDate", taifex::query_date(start)),
        ("queryEndDate", taifex::query_date(end)),
    ];
    let csv_text = util::http::post_form(&url, Some(headers), &params)
        .await?
        .text_force_big5()
        .await?;

    parse(&csv_text)
}

/// 欄位：日期、賣權成交量、買權成交量、買賣權成交量比率%、賣權未平倉量、買權未平倉量、買賣權未平倉量比率%
fn parse(csv_text: &str) -> Result<Vec<PutCallRatio>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        let preview: String = csv_text.chars().take(100).collect();
        return Err(anyhow!("Unexpected pcRatioDown content: {}", preview));
    }
    let ratio_index = headers
        .iter()
        .position(|h| h.contains(OPEN_INTEREST_RATIO))
        .unwrap_or(6);

    let mut result = Vec::with_capacity(8);
    for record in reader.records() {
        let record = record?;
        let date = match record.get(0).and_then(datetime::parse_slash_date) {
            Some(date) => date,
            None => continue,
        };
        if let Some(ratio) = record.get(ratio_index).and_then(text::parse_optional_f64) {
            result.push(PutCallRatio { date, ratio });
        }
    }

    result.sort_by_key(|r| r.date);
    Ok(result)
}
