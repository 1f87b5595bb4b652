use std::{collections::BTreeMap, future::Future};

use anyhow::Result;
use chrono::NaiveDate;
use hashbrown::HashMap;
use strum::IntoEnumIterator;

use crate::{
    crawler::{taifex, twse, yahoo},
    declare::MarketIndicator,
    fetcher::record::{DailyBar, MarketFlow, Quote},
    logging,
    util::{datetime, http},
};

/// 大盤單日的法人與融資資料
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketDay {
    pub date: NaiveDate,
    pub flow: Option<MarketFlow>,
    /// 融資餘額增減（億元）
    pub margin_change: Option<f64>,
}

/// 大盤歷史序列，皆由舊到新排序，休市日不會出現
#[derive(Debug, Clone, Default)]
pub struct MarketHistory {
    pub days: Vec<MarketDay>,
    pub put_call_ratios: Vec<(NaiveDate, f64)>,
    pub foreign_futures: Vec<(NaiveDate, i64)>,
    pub index_bars: Vec<DailyBar>,
}

impl MarketHistory {
    pub fn foreign_net(&self) -> Vec<f64> {
        self.flow_values(|f| f.foreign_net)
    }

    pub fn trust_net(&self) -> Vec<f64> {
        self.flow_values(|f| f.trust_net)
    }

    pub fn total_net(&self) -> Vec<f64> {
        self.flow_values(|f| f.total_net)
    }

    pub fn margin_changes(&self) -> Vec<f64> {
        self.days.iter().filter_map(|d| d.margin_change).collect()
    }

    pub fn put_call_values(&self) -> Vec<f64> {
        self.put_call_ratios.iter().map(|(_, v)| *v).collect()
    }

    pub fn foreign_futures_values(&self) -> Vec<f64> {
        self.foreign_futures.iter().map(|(_, v)| *v as f64).collect()
    }

    /// 加權指數成交量（億股）
    pub fn index_volumes(&self) -> Vec<f64> {
        self.index_bars
            .iter()
            .map(|b| b.volume as f64 / 100_000_000.0)
            .collect()
    }

    fn flow_values(&self, pick: impl Fn(&MarketFlow) -> Option<f64>) -> Vec<f64> {
        self.days
            .iter()
            .filter_map(|d| d.flow.as_ref().and_then(&pick))
            .collect()
    }

    fn day(&self, date: NaiveDate) -> Option<&MarketDay> {
        self.days.iter().find(|d| d.date == date)
    }
}

/// 報表日期當天的大盤指標
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    pub date: NaiveDate,
    pub quotes: HashMap<MarketIndicator, Quote>,
}

impl MarketSnapshot {
    /// 國內指標只取報表日期當天的資料，國際指標為當天（含）以前最後一個收盤
    pub fn new(
        date: NaiveDate,
        history: &MarketHistory,
        international: HashMap<MarketIndicator, Quote>,
    ) -> Self {
        let mut quotes = international;
        let day = history.day(date);
        let flow = day.and_then(|d| d.flow.as_ref());
        let plain = |value: Option<f64>| {
            value.map(|value| Quote {
                value,
                change_pct: None,
            })
        };

        for indicator in MarketIndicator::iter() {
            let quote = match indicator {
                MarketIndicator::Taiex => taiex_quote(date, &history.index_bars),
                MarketIndicator::ForeignNet => plain(flow.and_then(|f| f.foreign_net)),
                MarketIndicator::TrustNet => plain(flow.and_then(|f| f.trust_net)),
                MarketIndicator::TotalNet => plain(flow.and_then(|f| f.total_net)),
                MarketIndicator::MarginChange => plain(day.and_then(|d| d.margin_change)),
                MarketIndicator::PutCallRatio => plain(
                    history
                        .put_call_ratios
                        .iter()
                        .find(|(d, _)| *d == date)
                        .map(|(_, v)| *v),
                ),
                MarketIndicator::ForeignFutures => plain(
                    history
                        .foreign_futures
                        .iter()
                        .find(|(d, _)| *d == date)
                        .map(|(_, v)| *v as f64),
                ),
                _ => continue,
            };

            if let Some(quote) = quote {
                quotes.insert(indicator, quote);
            }
        }

        MarketSnapshot { date, quotes }
    }

    pub fn quote(&self, indicator: MarketIndicator) -> Option<Quote> {
        self.quotes.get(&indicator).copied()
    }
}

fn taiex_quote(date: NaiveDate, bars: &[DailyBar]) -> Option<Quote> {
    let index = bars.iter().position(|b| b.date == date)?;
    let close = bars[index].close;
    let change_pct = index
        .checked_sub(1)
        .map(|i| bars[i].close)
        .filter(|prev| *prev != 0.0)
        .map(|prev| ((close - prev) / prev * 10000.0).round() / 100.0);

    Some(Quote {
        value: close,
        change_pct,
    })
}

/// 大盤歷史抓取參數
#[derive(Debug, Clone, Copy)]
pub struct MarketRequest {
    pub date: NaiveDate,
    /// 法人與融資需要的交易日數
    pub days: usize,
    /// 額外多抓的工作日數
    pub buffer_days: usize,
}

/// P/C ratio 與期貨只需要 5 日統計
const SHORT_WINDOW: usize = 5;

/// 逐日抓取大盤歷史，任何單日失敗只記錄並略過；遭到封鎖時停止該來源剩下的請求
pub async fn fetch_history(request: MarketRequest) -> MarketHistory {
    let weekdays = datetime::previous_weekdays(request.date, request.days + request.buffer_days);
    let short_weekdays =
        datetime::previous_weekdays(request.date, SHORT_WINDOW + SHORT_WINDOW);

    MarketHistory {
        days: fetch_market_days(&weekdays).await,
        put_call_ratios: fetch_put_call_ratios(&short_weekdays).await,
        foreign_futures: fetch_foreign_futures(&short_weekdays).await,
        index_bars: match twse::taiwan_capitalization_weighted_stock_index::visit(request.date)
            .await
        {
            Ok(bars) => bars,
            Err(why) => {
                logging::warn_file_async(format!("Failed to fetch TAIEX because {:?}", why));
                vec![]
            }
        },
    }
}

/// 逐日抓取的結果，皆由舊到新排序
#[derive(Debug, Clone)]
struct Collected<T> {
    values: Vec<(NaiveDate, T)>,
    /// 請求失敗或因封鎖而未請求的日期
    failed: Vec<NaiveDate>,
}

/// 由最新的日期往前逐日抓取，報表日期最先請求
///
/// 休市日 (`Ok(None)`) 不算失敗；遭到封鎖時停止這個來源剩下的請求，
/// 未請求的日期記為失敗
async fn collect_newest_first<T, F, Fut>(
    source: &str,
    weekdays: &[NaiveDate],
    mut fetch: F,
) -> Collected<T>
where
    F: FnMut(NaiveDate) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let mut values = Vec::with_capacity(weekdays.len());
    let mut failed = Vec::new();

    for (i, date) in weekdays.iter().enumerate().rev() {
        match fetch(*date).await {
            Ok(Some(value)) => values.push((*date, value)),
            Ok(None) => {}
            Err(why) => {
                if stop_on_lockout(source, *date, &why) {
                    failed.extend_from_slice(&weekdays[..=i]);
                    break;
                }
                failed.push(*date);
            }
        }
    }

    values.reverse();
    failed.sort();

    Collected { values, failed }
}

/// 最近 5 個有資料的交易日之間（含之後）有失敗的日期時，5 日統計會涵蓋更長的期間
fn window_gaps<T>(values: &[(NaiveDate, T)], failed: &[NaiveDate]) -> Vec<NaiveDate> {
    let oldest_in_window = match values.len().checked_sub(SHORT_WINDOW) {
        Some(i) => values[i].0,
        None => return failed.to_vec(),
    };

    failed
        .iter()
        .filter(|d| **d > oldest_in_window)
        .copied()
        .collect()
}

fn warn_window_gaps<T>(source: &str, collected: &Collected<T>) {
    let gaps = window_gaps(&collected.values, &collected.failed);
    if gaps.is_empty() {
        return;
    }

    let dates: Vec<String> = gaps.iter().map(|d| d.to_string()).collect();
    let msg = format!(
        "{} failed on {} inside the latest 5-day window; the 5-day statistics span more sessions",
        source,
        dates.join(", ")
    );
    logging::warn_file_async(msg.clone());
    logging::warn_console(msg);
}

async fn fetch_market_days(weekdays: &[NaiveDate]) -> Vec<MarketDay> {
    let flows =
        collect_newest_first("BFI82U", weekdays, twse::institutional_investors::visit).await;
    let margins = collect_newest_first("MI_MARGN", weekdays, |date| async move {
        twse::margin_trading::visit(date)
            .await
            .map(|summary| summary.map(|s| s.change()))
    })
    .await;
    warn_window_gaps("BFI82U", &flows);
    warn_window_gaps("MI_MARGN", &margins);

    merge_market_days(flows.values, margins.values)
}

/// 依日期合併法人與融資，任一邊有資料的日期就保留
fn merge_market_days(
    flows: Vec<(NaiveDate, MarketFlow)>,
    margins: Vec<(NaiveDate, f64)>,
) -> Vec<MarketDay> {
    let mut days: BTreeMap<NaiveDate, MarketDay> = BTreeMap::new();

    for (date, flow) in flows {
        days.entry(date)
            .or_insert_with(|| MarketDay {
                date,
                ..Default::default()
            })
            .flow = Some(flow);
    }

    for (date, change) in margins {
        days.entry(date)
            .or_insert_with(|| MarketDay {
                date,
                ..Default::default()
            })
            .margin_change = Some(change);
    }

    days.into_values().collect()
}

async fn fetch_put_call_ratios(weekdays: &[NaiveDate]) -> Vec<(NaiveDate, f64)> {
    let (start, end) = match (weekdays.first(), weekdays.last()) {
        (Some(start), Some(end)) => (*start, *end),
        _ => return vec![],
    };

    match taifex::put_call_ratio::visit(start, end).await {
        Ok(list) => list.into_iter().map(|r| (r.date, r.ratio)).collect(),
        Err(why) => {
            logging::warn_file_async(format!("Failed to fetch P/C ratio because {:?}", why));
            vec![]
        }
    }
}

async fn fetch_foreign_futures(weekdays: &[NaiveDate]) -> Vec<(NaiveDate, i64)> {
    let futures = collect_newest_first(
        "futContractsDate",
        weekdays,
        taifex::futures_open_interest::visit,
    )
    .await;
    warn_window_gaps("futContractsDate", &futures);

    futures.values
}

/// 記錄失敗，回傳是否因為封鎖而應停止後續請求
fn stop_on_lockout(source: &str, date: NaiveDate, why: &anyhow::Error) -> bool {
    if http::is_locked_out(why) {
        let msg = format!(
            "{} locked out on {}; skipping the remaining history requests: {}",
            source, date, why
        );
        logging::error_file_async(msg.clone());
        logging::error_console(msg);
        return true;
    }

    logging::warn_file_async(format!(
        "Failed to fetch {} on {} because {:?}",
        source, date, why
    ));
    false
}

/// 抓取國際指標，單一指標失敗時該指標留空
pub async fn fetch_international(date: NaiveDate) -> HashMap<MarketIndicator, Quote> {
    let mut quotes = HashMap::new();

    for indicator in MarketIndicator::iter() {
        let symbol = match indicator.yahoo_symbol() {
            Some(symbol) => symbol,
            None => continue,
        };

        match yahoo::chart::visit(symbol, date).await {
            Ok(Some(quote)) => {
                quotes.insert(indicator, quote);
            }
            Ok(None) => logging::warn_file_async(format!(
                "{} has no close on or before {}",
                symbol, date
            )),
            Err(why) => logging::warn_file_async(format!(
                "Failed to fetch {} because {:?}",
                symbol, why
            )),
        }
    }

    quotes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn history() -> MarketHistory {
        let day = |d: u32, foreign: f64, margin: Option<f64>| MarketDay {
            date: ymd(d),
            flow: Some(MarketFlow {
                date: ymd(d),
                foreign_net: Some(foreign),
                trust_net: Some(1.0),
                dealer_net: None,
                total_net: Some(foreign + 1.0),
            }),
            margin_change: margin,
        };
        let bar = |d: u32, close: f64| {
            DailyBar::new(ymd(d), close, close, close, close, 500_000_000).unwrap()
        };

        MarketHistory {
            days: vec![day(22, -50.0, Some(3.0)), day(23, 120.5, None)],
            put_call_ratios: vec![(ymd(22), 98.0), (ymd(23), 110.0)],
            foreign_futures: vec![(ymd(22), -30321)],
            index_bars: vec![bar(22, 20000.0), bar(23, 20100.0)],
        }
    }

    #[test]
    fn test_history_series() {
        let h = history();
        assert_eq!(h.foreign_net(), vec![-50.0, 120.5]);
        assert_eq!(h.margin_changes(), vec![3.0]);
        assert_eq!(h.foreign_futures_values(), vec![-30321.0]);
        assert_eq!(h.index_volumes(), vec![5.0, 5.0]);
    }

    #[test]
    fn test_snapshot_uses_report_date_only() {
        let mut international = HashMap::new();
        international.insert(
            MarketIndicator::Vix,
            Quote {
                value: 18.15,
                change_pct: Some(10.0),
            },
        );

        let snapshot = MarketSnapshot::new(ymd(23), &history(), international);
        assert_eq!(snapshot.quote(MarketIndicator::Vix).unwrap().value, 18.15);
        assert_eq!(snapshot.quote(MarketIndicator::ForeignNet).unwrap().value, 120.5);
        assert_eq!(snapshot.quote(MarketIndicator::TotalNet).unwrap().value, 121.5);
        assert_eq!(snapshot.quote(MarketIndicator::PutCallRatio).unwrap().value, 110.0);

        let taiex = snapshot.quote(MarketIndicator::Taiex).unwrap();
        assert_eq!(taiex.value, 20100.0);
        assert_eq!(taiex.change_pct, Some(0.5));

        assert!(snapshot.quote(MarketIndicator::MarginChange).is_none());
        assert!(snapshot.quote(MarketIndicator::ForeignFutures).is_none());
        assert!(snapshot.quote(MarketIndicator::Gold).is_none());
    }

    fn lockout() -> anyhow::Error {
        http::LockedOut {
            url: "https://www.twse.com.tw/rwd/zh/fund/BFI82U".to_string(),
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
        }
        .into()
    }

    #[tokio::test]
    async fn test_lockout_keeps_report_date() {
        let weekdays: Vec<NaiveDate> = (5..=9).map(ymd).collect();
        let mut calls = 0;

        // 第 3 次請求遭到封鎖
        let collected = collect_newest_first("BFI82U", &weekdays, |date| {
            calls += 1;
            let n = calls;
            async move {
                if n == 3 {
                    Err(lockout())
                } else {
                    Ok(Some(date.format("%d").to_string()))
                }
            }
        })
        .await;

        assert_eq!(calls, 3);
        assert_eq!(
            collected.values,
            vec![(ymd(8), "08".to_string()), (ymd(9), "09".to_string())]
        );
        assert_eq!(collected.failed, vec![ymd(5), ymd(6), ymd(7)]);
    }

    #[tokio::test]
    async fn test_holiday_is_not_failure() {
        let weekdays: Vec<NaiveDate> = (5..=9).map(ymd).collect();

        let collected = collect_newest_first("MI_MARGN", &weekdays, |date| async move {
            if date == ymd(7) {
                Ok(None)
            } else if date == ymd(6) {
                Err(anyhow::anyhow!("connection reset"))
            } else {
                Ok(Some(1.5))
            }
        })
        .await;

        let dates: Vec<NaiveDate> = collected.values.iter().map(|(d, _)| *d).collect();
        assert_eq!(dates, vec![ymd(5), ymd(8), ymd(9)]);
        assert_eq!(collected.failed, vec![ymd(6)]);
    }

    #[test]
    fn test_window_gaps() {
        let values: Vec<(NaiveDate, ())> =
            [2, 5, 6, 7, 9, 12].into_iter().map(|d| (ymd(d), ())).collect();

        // 最近 5 筆從 5 日開始，8 日失敗落在區間內，1 日在區間外
        assert_eq!(window_gaps(&values, &[ymd(1), ymd(8)]), vec![ymd(8)]);
        assert!(window_gaps(&values, &[ymd(1)]).is_empty());

        // 不足 5 筆時所有失敗都算
        assert_eq!(window_gaps(&values[..3], &[ymd(1)]), vec![ymd(1)]);
    }

    #[test]
    fn test_merge_market_days() {
        let flow = MarketFlow {
            date: ymd(6),
            ..Default::default()
        };
        let days = merge_market_days(
            vec![(ymd(6), flow.clone())],
            vec![(ymd(5), -12.3), (ymd(6), 4.5)],
        );

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, ymd(5));
        assert!(days[0].flow.is_none());
        assert_eq!(days[0].margin_change, Some(-12.3));
        assert_eq!(days[1].flow, Some(flow));
        assert_eq!(days[1].margin_change, Some(4.5));
    }
}
