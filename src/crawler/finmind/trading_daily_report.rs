use anyhow::Result;
use chrono::NaiveDate;
use serde_derive::Deserialize;

use crate::{crawler::finmind::HOST, fetcher::record::BrokerFlow, util};

#[derive(Deserialize, Debug, Clone)]
struct TradingDailyReport {
    securities_trader_id: String,
    #[serde(default)]
    buy: f64,
    #[serde(default)]
    sell: f64,
}

/// 抓取個股某一天的券商分點買賣（股），需要 sponsor token
///
/// 同一分點會依成交價拆成多筆，回傳前不合併，由指標計算時彙總
pub async fn visit(stock_symbol: &str, date: NaiveDate, token: &str) -> Result<Vec<BrokerFlow>> {
    let url = format!(
        "https://{host}/api/v4/taiwan_stock_trading_daily_report?data_id={symbol}&date={date}",
        host = HOST,
        symbol = urlencoding::encode(stock_symbol),
        date = date.format("%Y-%m-%d"),
    );

    let res = util::http::get_json::<super::Response<TradingDailyReport>>(
        &url,
        Some(super::build_headers(token)?),
    )
    .await?;
    let rows = super::unwrap_response("taiwan_stock_trading_daily_report", res)?;

    Ok(to_flows(stock_symbol, date, rows))
}

fn to_flows(stock_symbol: &str, date: NaiveDate, rows: Vec<TradingDailyReport>) -> Vec<BrokerFlow> {
    rows.into_iter()
        .map(|r| BrokerFlow {
            date,
            instrument: stock_symbol.to_string(),
            broker_id: r.securities_trader_id.trim().to_string(),
            buy_volume: r.buy.round() as i64,
            sell_volume: r.sell.round() as i64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_flows() {
        let rows: Vec<TradingDailyReport> = serde_json::from_str(
            r#"[
                {"securities_trader":"凱基台北","price":1700.0,"buy":3000,"sell":0,"securities_trader_id":"9268","stock_id":"2330","date":"2026-01-23"},
                {"securities_trader":"凱基台北","price":1705.0,"buy":0,"sell":1000,"securities_trader_id":"9268","stock_id":"2330","date":"2026-01-23"}
            ]"#,
        )
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 1, 23).unwrap();
        let flows = to_flows("2330", date, rows);
        assert_eq!(flows.len(), 2);
        assert_eq!(flows.iter().map(|f| f.net()).sum::<i64>(), 2000);
        assert!(flows.iter().all(|f| f.broker_id == "9268" && f.date == date));
    }
}
