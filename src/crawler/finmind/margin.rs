use anyhow::Result;
use chrono::NaiveDate;
use serde_derive::Deserialize;

use crate::fetcher::record::{sort_dedup, MarginBalance};

const DATASET: &str = "TaiwanStockMarginPurchaseShortSale";

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
struct MarginPurchaseShortSale {
    #[serde(rename = "date")]
    date: String,
    #[serde(default)]
    margin_purchase_today_balance: f64,
    #[serde(default)]
    margin_purchase_yesterday_balance: f64,
    #[serde(default)]
    short_sale_today_balance: f64,
    #[serde(default)]
    short_sale_yesterday_balance: f64,
}

/// 抓取個股融資融券餘額（張）
pub async fn visit(
    stock_symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    token: Option<&str>,
) -> Result<Vec<MarginBalance>> {
    let rows =
        super::fetch_dataset::<MarginPurchaseShortSale>(DATASET, stock_symbol, start, end, token)
            .await?;
    Ok(to_balances(rows))
}

fn to_balances(rows: Vec<MarginPurchaseShortSale>) -> Vec<MarginBalance> {
    let balances = rows
        .into_iter()
        .filter_map(|r| {
            Some(MarginBalance {
                date: NaiveDate::parse_from_str(&r.date, "%Y-%m-%d").ok()?,
                margin_balance: r.margin_purchase_today_balance.round() as i64,
                margin_previous: r.margin_purchase_yesterday_balance.round() as i64,
                short_balance: r.short_sale_today_balance.round() as i64,
                short_previous: r.short_sale_yesterday_balance.round() as i64,
            })
        })
        .collect();

    sort_dedup(balances)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_balances() {
        let rows: Vec<MarginPurchaseShortSale> = serde_json::from_str(
            r#"[{"date":"2026-01-23","stock_id":"2330","MarginPurchaseBuy":1200,
                 "MarginPurchaseTodayBalance":25300,"MarginPurchaseYesterdayBalance":25000,
                 "ShortSaleTodayBalance":120,"ShortSaleYesterdayBalance":150,"Note":""}]"#,
        )
        .unwrap();

        let balances = to_balances(rows);
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].margin_change(), 300);
        assert_eq!(balances[0].short_balance, 120);
    }
}
