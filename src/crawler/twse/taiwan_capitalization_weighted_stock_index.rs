use anyhow::Result;
use chrono::NaiveDate;
use hashbrown::HashMap;

use crate::{
    crawler::twse::{self, Response},
    fetcher::record::{sort_dedup, DailyBar},
    logging,
    util::{datetime, text},
};

/// 盤中指數的開高低收
#[derive(Debug, Clone, Copy, PartialEq)]
struct IndexOhlc {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// 抓取 `date` 當月與前一個月的加權指數日線，只保留 `date`（含）以前的交易日
///
/// 成交量取自市場成交資訊 (FMTQIK)，單位為股；開高低取自每日指數 (MI_5MINS_HIST)，
/// 後者查詢失敗時以收盤價代替
pub async fn visit(date: NaiveDate) -> Result<Vec<DailyBar>> {
    let months = [
        datetime::first_day_of_previous_month(date),
        datetime::first_day_of_month(date),
    ];
    let mut bars = Vec::with_capacity(45);

    for month in months {
        let month_str = month.format("%Y%m%d").to_string();
        let volumes = match twse::fetch(&format!(
            "/exchangeReport/FMTQIK?response=json&date={}",
            month_str
        ))
        .await?
        {
            Some(res) => parse_market_summary(&res),
            None => continue,
        };

        let ohlc = match twse::fetch(&format!(
            "/indicesReport/MI_5MINS_HIST?response=json&date={}",
            month_str
        ))
        .await
        {
            Ok(Some(res)) => parse_index_history(&res),
            Ok(None) => HashMap::new(),
            Err(why) => {
                logging::warn_file_async(format!(
                    "Failed to fetch MI_5MINS_HIST {} because {:?}",
                    month_str, why
                ));
                HashMap::new()
            }
        };

        bars.extend(merge(volumes, &ohlc));
    }

    bars.retain(|b| b.date <= date);

    Ok(sort_dedup(bars))
}

/// 日期、成交股數、成交金額、成交筆數、發行量加權股價指數、漲跌點數
fn parse_market_summary(res: &Response) -> Vec<(NaiveDate, i64, f64)> {
    res.data
        .iter()
        .filter_map(|row| {
            let date = datetime::parse_taiwan_date(&twse::cell(row, 0))?;
            let volume = text::parse_i64(&twse::cell(row, 1), None).ok()?;
            let close = text::parse_f64(&twse::cell(row, 4), None).ok()?;
            Some((date, volume, close))
        })
        .collect()
}

/// 日期、開盤指數、最高指數、最低指數、收盤指數
fn parse_index_history(res: &Response) -> HashMap<NaiveDate, IndexOhlc> {
    res.data
        .iter()
        .filter_map(|row| {
            let date = datetime::parse_taiwan_date(&twse::cell(row, 0))?;
            let price = |i: usize| text::parse_f64(&twse::cell(row, i), None).ok();
            Some((
                date,
                IndexOhlc {
                    open: price(1)?,
                    high: price(2)?,
                    low: price(3)?,
                    close: price(4)?,
                },
            ))
        })
        .collect()
}

fn merge(
    volumes: Vec<(NaiveDate, i64, f64)>,
    ohlc: &HashMap<NaiveDate, IndexOhlc>,
) -> Vec<DailyBar> {
    volumes
        .into_iter()
        .filter_map(|(date, volume, close)| match ohlc.get(&date) {
            Some(p) => DailyBar::new(date, p.open, p.high, p.low, close, volume),
            None => DailyBar::new(date, close, close, close, close, volume),
        })
        .collect()
}
