use anyhow::Result;
use chrono::NaiveDate;
use serde_derive::Deserialize;

use crate::{
    fetcher::record::{sort_dedup, DailyBar},
    logging,
};

const DATASET: &str = "TaiwanStockPrice";

#[derive(Deserialize, Debug, Clone)]
struct Price {
    date: String,
    #[serde(rename = "Trading_Volume", default)]
    trading_volume: f64,
    #[serde(default)]
    open: f64,
    #[serde(default)]
    max: f64,
    #[serde(default)]
    min: f64,
    #[serde(default)]
    close: f64,
}

/// 抓取個股 `start`~`end` 的日線
pub async fn visit(
    stock_symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    token: Option<&str>,
) -> Result<Vec<DailyBar>> {
    let rows = super::fetch_dataset::<Price>(DATASET, stock_symbol, start, end, token).await?;
    Ok(to_bars(stock_symbol, rows))
}

/// 沒有成交（價格為 0）的日子略過
fn to_bars(stock_symbol: &str, rows: Vec<Price>) -> Vec<DailyBar> {
    let bars = rows
        .into_iter()
        .filter_map(|p| {
            let date = NaiveDate::parse_from_str(&p.date, "%Y-%m-%d").ok()?;
            let bar = DailyBar::new(
                date,
                p.open,
                p.max,
                p.min,
                p.close,
                p.trading_volume.round() as i64,
            );
            if bar.is_none() {
                logging::warn_file_async(format!(
                    "{} {} skipped an invalid price row {:?}",
                    DATASET, stock_symbol, p
                ));
            }
            bar
        })
        .collect();

    sort_dedup(bars)
}
