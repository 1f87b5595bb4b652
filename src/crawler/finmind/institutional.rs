use anyhow::Result;
use chrono::NaiveDate;
use hashbrown::HashMap;
use serde_derive::Deserialize;

use crate::fetcher::record::{sort_dedup, InstitutionalFlow};

const DATASET: &str = "TaiwanStockInstitutionalInvestorsBuySell";

#[derive(Deserialize, Debug, Clone)]
struct BuySell {
    date: String,
    name: String,
    #[serde(default)]
    buy: f64,
    #[serde(default)]
    sell: f64,
}

/// 抓取個股三大法人每日買賣超（股）
pub async fn visit(
    stock_symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    token: Option<&str>,
) -> Result<Vec<InstitutionalFlow>> {
    let rows = super::fetch_dataset::<BuySell>(DATASET, stock_symbol, start, end, token).await?;
    Ok(aggregate(rows))
}

/// 一天會有多筆（各法人一筆），依日期彙總成一筆
///
/// 外資只取 Foreign_Investor（不含外資自營商），自營商為自行買賣加避險
fn aggregate(rows: Vec<BuySell>) -> Vec<InstitutionalFlow> {
    let mut by_date: HashMap<NaiveDate, InstitutionalFlow> = HashMap::new();

    for row in rows {
        let date = match NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => continue,
        };
        let net = (row.buy - row.sell).round() as i64;
        let flow = by_date.entry(date).or_insert_with(|| InstitutionalFlow {
            date,
            ..Default::default()
        });

        match row.name.as_str() {
            "Foreign_Investor" => flow.foreign_net += net,
            "Investment_Trust" => flow.trust_net += net,
            "Dealer_self" | "Dealer_Hedging" => flow.dealer_net += net,
            _ => {}
        }
    }

    sort_dedup(by_date.into_values().collect())
}
