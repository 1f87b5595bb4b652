use anyhow::Result;
use chrono::NaiveDate;
use serde_json::Value;

use crate::{
    crawler::twse::{self, Response},
    util::text,
};

/// 大盤融資金額（仟元）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginSummary {
    pub date: NaiveDate,
    pub previous_balance: f64,
    pub today_balance: f64,
}

impl MarginSummary {
    /// 融資餘額增減，仟元 => 億元
    pub fn change(&self) -> f64 {
        ((self.today_balance - self.previous_balance) / 100_000.0 * 100.0).round() / 100.0
    }
}

/// 抓取信用交易統計，休市日回傳 None
pub async fn visit(date: NaiveDate) -> Result<Option<MarginSummary>> {
    let path = format!(
        "/rwd/zh/marginTrading/MI_MARGN?response=json&date={}&selectType=ALL",
        date.format("%Y%m%d")
    );

    Ok(twse::fetch(&path).await?.and_then(|res| parse(date, &res)))
}

/// 信用交易統計表的列依序為融資(交易單位)、融券(交易單位)、融資金額(仟元)
fn parse(date: NaiveDate, res: &Response) -> Option<MarginSummary> {
    let table = res.tables.first()?;
    let row: &Vec<Value> = table
        .data
        .iter()
        .find(|row| twse::cell(row, 0).contains("融資金額"))
        .or_else(|| table.data.get(2))?;

    let previous = twse::field_index(&table.fields, "前日餘額", 4);
    let today = twse::field_index(&table.fields, "今日餘額", 5);

    Some(MarginSummary {
        date,
        previous_balance: text::parse_f64(&twse::cell(row, previous), None).ok()?,
        today_balance: text::parse_f64(&twse::cell(row, today), None).ok()?,
    })
}
