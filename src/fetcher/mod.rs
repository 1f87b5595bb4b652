//! 單次執行的資料抓取：大盤歷史、國際指標與觀察清單上每檔股票的序列。
//! 抓到的資料只存在 [`FetchResult`]，不跨執行保留。

use chrono::NaiveDate;

use crate::{
    config::{watchlist::WatchlistEntry, SETTINGS},
    crawler::StockChips,
    logging,
};

pub mod market;
pub mod record;
pub mod stock;

pub use market::{MarketHistory, MarketSnapshot};
pub use stock::StockFetch;

/// 一次執行抓到的全部資料
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub date: NaiveDate,
    pub market: MarketSnapshot,
    pub history: MarketHistory,
    /// 與觀察清單同順序
    pub stocks: Vec<StockFetch>,
}

impl FetchResult {
    pub fn failed(&self) -> impl Iterator<Item = &StockFetch> {
        self.stocks
            .iter()
            .filter(|s| matches!(s, StockFetch::Failed { .. }))
    }
}

pub struct Fetcher<'a> {
    date: NaiveDate,
    source: &'a dyn StockChips,
}

impl<'a> Fetcher<'a> {
    pub fn new(date: NaiveDate, source: &'a dyn StockChips) -> Self {
        Fetcher { date, source }
    }

    /// 依序抓取，所有請求一次一個
    pub async fn run(&self, watchlist: &[WatchlistEntry]) -> FetchResult {
        logging::info_console(format!("抓取 {} 大盤歷史資料", self.date));
        let history = market::fetch_history(market::MarketRequest {
            date: self.date,
            days: SETTINGS.history.days,
            buffer_days: SETTINGS.history.buffer_days,
        })
        .await;

        logging::info_console("抓取國際指標".to_string());
        let international = market::fetch_international(self.date).await;
        let market = MarketSnapshot::new(self.date, &history, international);

        let request = stock::StockRequest {
            date: self.date,
            lookback_days: SETTINGS.history.lookback_days,
            // 最早一列的 5 日集中度需要往前 4 個交易日
            broker_days: SETTINGS.report.stock_rows + 4,
        };
        let mut stocks = Vec::with_capacity(watchlist.len());
        for entry in watchlist {
            logging::info_console(format!("抓取 {} {}", entry.code, entry.name));
            let fetched = stock::fetch(self.source, entry, request).await;
            if let StockFetch::Failed { reason, .. } = &fetched {
                logging::error_console(format!(
                    "{} {} 抓取失敗，不列入個股籌碼: {}",
                    entry.code, entry.name, reason
                ));
            }
            stocks.push(fetched);
        }

        FetchResult {
            date: self.date,
            market,
            history,
            stocks,
        }
    }
}
