use chrono::NaiveDate;
use serde::Serialize;

use crate::{config::watchlist::WatchlistEntry, util::map::Keyable};

/// 單一商品單一交易日的日線，成交量單位為股
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl DailyBar {
    /// 建立日線並檢查價格與成交量，不合理的資料回傳 None
    pub fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    ) -> Option<Self> {
        let prices = [open, high, low, close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) || volume < 0 {
            return None;
        }

        // 交易所偶有高低價與開收價不一致的資料，以四個價格的極值校正
        let high = prices.iter().cloned().fold(f64::MIN, f64::max);
        let low = prices.iter().cloned().fold(f64::MAX, f64::min);

        Some(DailyBar {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

impl Keyable for DailyBar {
    type Key = NaiveDate;

    fn key(&self) -> Self::Key {
        self.date
    }
}

/// 券商分點單日買賣股數，只有 sponsor 資料源提供
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerFlow {
    pub date: NaiveDate,
    pub instrument: String,
    pub broker_id: String,
    pub buy_volume: i64,
    pub sell_volume: i64,
}

impl BrokerFlow {
    pub fn net(&self) -> i64 {
        self.buy_volume - self.sell_volume
    }
}

/// 個股三大法人單日買賣超，單位為股
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InstitutionalFlow {
    pub date: NaiveDate,
    pub foreign_net: i64,
    pub trust_net: i64,
    pub dealer_net: i64,
}

impl Keyable for InstitutionalFlow {
    type Key = NaiveDate;

    fn key(&self) -> Self::Key {
        self.date
    }
}

/// 個股融資融券餘額，單位為張
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginBalance {
    pub date: NaiveDate,
    pub margin_balance: i64,
    pub margin_previous: i64,
    pub short_balance: i64,
    pub short_previous: i64,
}

impl MarginBalance {
    pub fn margin_change(&self) -> i64 {
        self.margin_balance - self.margin_previous
    }
}

impl Keyable for MarginBalance {
    type Key = NaiveDate;

    fn key(&self) -> Self::Key {
        self.date
    }
}

/// 個股借券賣出異動，單位為股
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SblActivity {
    pub date: NaiveDate,
    pub previous_balance: Option<i64>,
    pub short_sales: i64,
    pub returns: i64,
    pub adjustments: i64,
    pub current_balance: Option<i64>,
}

impl Keyable for SblActivity {
    type Key = NaiveDate;

    fn key(&self) -> Self::Key {
        self.date
    }
}

/// 大盤三大法人買賣超，單位為億元
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketFlow {
    pub date: NaiveDate,
    pub foreign_net: Option<f64>,
    pub trust_net: Option<f64>,
    pub dealer_net: Option<f64>,
    pub total_net: Option<f64>,
}

/// 國際指標收盤值與單日漲跌幅
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub value: f64,
    pub change_pct: Option<f64>,
}

/// 單一股票計算指標所需的全部原始序列，皆已依日期由舊到新排序
#[derive(Debug, Clone)]
pub struct StockSeries {
    pub entry: WatchlistEntry,
    pub bars: Vec<DailyBar>,
    pub institutional: Vec<InstitutionalFlow>,
    pub margins: Vec<MarginBalance>,
    pub sbl: Vec<SblActivity>,
    /// None 代表沒有 token，分點資料完全沒有查詢
    pub broker_flows: Option<Vec<BrokerFlow>>,
}

impl StockSeries {
    pub fn new(entry: WatchlistEntry, bars: Vec<DailyBar>) -> Self {
        StockSeries {
            entry,
            bars: sort_dedup(bars),
            institutional: vec![],
            margins: vec![],
            sbl: vec![],
            broker_flows: None,
        }
    }
}

/// 依日期排序，同一天重複時保留最後一筆
pub fn sort_dedup<T: Keyable<Key = NaiveDate>>(mut records: Vec<T>) -> Vec<T> {
    records.sort_by_key(|r| r.key());

    let mut result: Vec<T> = Vec::with_capacity(records.len());
    for r in records {
        match result.last_mut() {
            Some(last) if last.key() == r.key() => *last = r,
            _ => result.push(r),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_daily_bar_validation() {
        let date = ymd(2026, 1, 23);
        assert!(DailyBar::new(date, 10.0, 11.0, 9.0, 10.5, 1000).is_some());
        assert!(DailyBar::new(date, 0.0, 11.0, 9.0, 10.5, 1000).is_none());
        assert!(DailyBar::new(date, 10.0, 11.0, 9.0, f64::NAN, 1000).is_none());
        assert!(DailyBar::new(date, 10.0, 11.0, 9.0, 10.5, -1).is_none());

        let fixed = DailyBar::new(date, 10.0, 9.5, 9.8, 10.2, 1).unwrap();
        assert_eq!(fixed.high, 10.2);
        assert_eq!(fixed.low, 9.5);
    }

    #[test]
    fn test_sort_dedup() {
        let bar = |d: u32, close: f64| DailyBar::new(ymd(2026, 1, d), close, close, close, close, 1).unwrap();
        let sorted = sort_dedup(vec![bar(3, 1.0), bar(1, 2.0), bar(3, 3.0), bar(2, 4.0)]);
        let closes: Vec<f64> = sorted.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![2.0, 4.0, 3.0]);
    }
}
