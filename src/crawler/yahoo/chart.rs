use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Deserialize;

use crate::{crawler::yahoo::HOST, fetcher::record::Quote, util};

#[derive(Deserialize, Debug)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Deserialize, Debug)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    meta: Meta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Deserialize, Debug)]
struct Meta {
    #[serde(default)]
    gmtoffset: i32,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Deserialize, Debug)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// 取得 `symbol` 在 `date`（含）以前最後一個交易日的收盤價與漲跌幅
pub async fn visit(symbol: &str, date: NaiveDate) -> Result<Option<Quote>> {
    let period1 = day_start_timestamp(date - Duration::days(10));
    let period2 = day_start_timestamp(date + Duration::days(1));
    let url = format!(
        "https://{host}/v8/finance/chart/{symbol}?period1={period1}&period2={period2}&interval=1d",
        host = HOST,
        symbol = urlencoding::encode(symbol),
        period1 = period1,
        period2 = period2,
    );

    let res = util::http::get_json::<ChartResponse>(&url, None).await?;
    let closes = daily_closes(res)?;

    Ok(quote_on(&closes, date))
}

fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// 轉成交易所當地日期的收盤價序列，略過 null
fn daily_closes(res: ChartResponse) -> Result<Vec<(NaiveDate, f64)>> {
    if let Some(err) = res.chart.error {
        return Err(anyhow!(
            "Yahoo chart error {}: {}",
            err.code.unwrap_or_default(),
            err.description.unwrap_or_default()
        ));
    }

    let result = match res.chart.result.and_then(|r| r.into_iter().next()) {
        Some(result) => result,
        None => return Ok(vec![]),
    };

    let offset = FixedOffset::east_opt(result.meta.gmtoffset)
        .ok_or_else(|| anyhow!("Invalid gmtoffset {}", result.meta.gmtoffset))?;
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut list: Vec<(NaiveDate, f64)> = result
        .timestamp
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let close = close.filter(|c| c.is_finite())?;
            let date = DateTime::from_timestamp(*ts, 0)?
                .with_timezone(&offset)
                .date_naive();
            Some((date, close))
        })
        .collect();
    list.sort_by_key(|(date, _)| *date);

    Ok(list)
}

/// 漲跌幅與前一個有收盤價的交易日比較
fn quote_on(closes: &[(NaiveDate, f64)], date: NaiveDate) -> Option<Quote> {
    let index = closes.iter().rposition(|(d, _)| *d <= date)?;
    let close = closes[index].1;
    let change_pct = index
        .checked_sub(1)
        .map(|i| closes[i].1)
        .filter(|prev| *prev != 0.0)
        .map(|prev| round2((close - prev) / prev * 100.0));

    Some(Quote {
        value: round2(close),
        change_pct,
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;

    fn ymd(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    #[test]
    fn test_daily_closes() {
        // 2026-01-21 ~ 2026-01-23 14:30 UTC，紐約時間 (UTC-5) 同一天
        let res: ChartResponse = serde_json::from_str(
            r#"{"chart":{"result":[{"meta":{"symbol":"^VIX","gmtoffset":-18000},
                "timestamp":[1769005800,1769092200,1769178600],
                "indicators":{"quote":[{"close":[16.5,null,18.15]}]}}],"error":null}}"#,
        )
        .unwrap();

        let closes = daily_closes(res).unwrap();
        assert_eq!(closes, vec![(ymd(21), 16.5), (ymd(23), 18.15)]);
    }

    #[test]
    fn test_chart_error() {
        let res: ChartResponse = serde_json::from_str(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        )
        .unwrap();
        assert!(daily_closes(res).is_err());
    }

    #[test]
    fn test_quote_on() {
        let closes = vec![(ymd(21), 20.0), (ymd(22), 22.0), (ymd(26), 11.0)];

        let quote = quote_on(&closes, ymd(23)).unwrap();
        assert_eq!(quote.value, 22.0);
        assert_eq!(quote.change_pct, Some(10.0));

        let first = quote_on(&closes, ymd(21)).unwrap();
        assert_eq!(first.change_pct, None);
        assert!(quote_on(&closes, ymd(20)).is_none());
    }

    #[tokio::test]
    #[ignore]
    async fn test_visit() {
        dotenv::dotenv().ok();
        let _ = rustls::crypto::ring::default_provider().install_default();
        logging::debug_file_async("開始 visit".to_string());

        match visit("^VIX", ymd(23)).await {
            Ok(quote) => logging::debug_file_async(format!("quote:{:?}", quote)),
            Err(why) => logging::debug_file_async(format!("Failed to visit because {:?}", why)),
        }

        logging::debug_file_async("結束 visit".to_string());
        logging::flush().await;
    }
}
