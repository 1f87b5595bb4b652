use anyhow::Result;
use chrono::NaiveDate;
use serde_derive::Deserialize;

use crate::fetcher::record::{sort_dedup, SblActivity};

const DATASET: &str = "TaiwanDailyShortSaleBalances";

#[derive(Deserialize, Debug, Clone)]
struct ShortSaleBalance {
    date: String,
    #[serde(rename = "SBLShortSalesPreviousDayBalance")]
    previous_day_balance: Option<f64>,
    #[serde(rename = "SBLShortSalesShortSales", default)]
    short_sales: f64,
    #[serde(rename = "SBLShortSalesReturns", default)]
    returns: f64,
    #[serde(rename = "SBLShortSalesAdjustments", default)]
    adjustments: f64,
    #[serde(rename = "SBLShortSalesCurrentDayBalance")]
    current_day_balance: Option<f64>,
}

/// 抓取個股借券賣出異動（股）
pub async fn visit(
    stock_symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    token: Option<&str>,
) -> Result<Vec<SblActivity>> {
    let rows =
        super::fetch_dataset::<ShortSaleBalance>(DATASET, stock_symbol, start, end, token).await?;
    Ok(to_activities(rows))
}

fn to_activities(rows: Vec<ShortSaleBalance>) -> Vec<SblActivity> {
    let activities = rows
        .into_iter()
        .filter_map(|r| {
            Some(SblActivity {
                date: NaiveDate::parse_from_str(&r.date, "%Y-%m-%d").ok()?,
                previous_balance: r.previous_day_balance.map(|v| v.round() as i64),
                short_sales: r.short_sales.round() as i64,
                returns: r.returns.round() as i64,
                adjustments: r.adjustments.round() as i64,
                current_balance: r.current_day_balance.map(|v| v.round() as i64),
            })
        })
        .collect();

    sort_dedup(activities)
}
