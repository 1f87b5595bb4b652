use anyhow::{anyhow, Result};
use chrono::{Duration, NaiveDate};

use crate::{
    config::watchlist::WatchlistEntry,
    crawler::StockChips,
    fetcher::record::{sort_dedup, BrokerFlow, StockSeries},
    logging,
    util::map::Keyable,
};

/// 單一股票的抓取結果
#[derive(Debug, Clone)]
pub enum StockFetch {
    Fetched(StockSeries),
    /// 任一序列抓取失敗，這檔股票不列入個股籌碼表
    Failed {
        entry: WatchlistEntry,
        reason: String,
    },
}

impl StockFetch {
    pub fn entry(&self) -> &WatchlistEntry {
        match self {
            StockFetch::Fetched(series) => &series.entry,
            StockFetch::Failed { entry, .. } => entry,
        }
    }

    pub fn series(&self) -> Option<&StockSeries> {
        match self {
            StockFetch::Fetched(series) => Some(series),
            StockFetch::Failed { .. } => None,
        }
    }
}

/// 抓取個股參數
#[derive(Debug, Clone, Copy)]
pub struct StockRequest {
    pub date: NaiveDate,
    /// 往回抓取的日曆天數
    pub lookback_days: i64,
    /// 需要券商分點的交易日數
    pub broker_days: usize,
}

pub async fn fetch(
    source: &dyn StockChips,
    entry: &WatchlistEntry,
    request: StockRequest,
) -> StockFetch {
    match fetch_series(source, entry, request).await {
        Ok(series) => StockFetch::Fetched(series),
        Err(why) => {
            let reason = format!("{:?}", why);
            logging::error_file_async(format!(
                "Failed to fetch {} {} because {}",
                entry.code, entry.name, reason
            ));
            StockFetch::Failed {
                entry: entry.clone(),
                reason,
            }
        }
    }
}

async fn fetch_series(
    source: &dyn StockChips,
    entry: &WatchlistEntry,
    request: StockRequest,
) -> Result<StockSeries> {
    let end = request.date;
    let start = end - Duration::days(request.lookback_days);
    let code = entry.code.as_str();

    let mut bars = source.daily_bars(code, start, end).await?;
    bars.retain(|b| b.date <= end);
    if bars.is_empty() {
        return Err(anyhow!("no price data between {} and {}", start, end));
    }

    let mut series = StockSeries::new(entry.clone(), bars);
    series.institutional = within(source.institutional(code, start, end).await?, end);
    series.margins = within(source.margins(code, start, end).await?, end);
    series.sbl = within(source.short_sale_balances(code, start, end).await?, end);

    if source.has_broker_access() {
        series.broker_flows = Some(fetch_broker_flows(source, &series, request.broker_days).await);
    }

    Ok(series)
}

/// 只查詢最近 `days` 個實際交易日；單日失敗只記錄，該日改由模擬補值
async fn fetch_broker_flows(
    source: &dyn StockChips,
    series: &StockSeries,
    days: usize,
) -> Vec<BrokerFlow> {
    let code = series.entry.code.as_str();
    let skip = series.bars.len().saturating_sub(days);
    let mut flows = Vec::new();

    for bar in &series.bars[skip..] {
        match source.broker_flows(code, bar.date).await {
            Ok(list) => flows.extend(list),
            Err(why) => logging::warn_file_async(format!(
                "Failed to fetch broker flows of {} on {} because {:?}",
                code, bar.date, why
            )),
        }
    }

    flows
}

fn within<T: Keyable<Key = NaiveDate>>(records: Vec<T>, end: NaiveDate) -> Vec<T> {
    let mut records = sort_dedup(records);
    records.retain(|r| r.key() <= end);
    records
}
