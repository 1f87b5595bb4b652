use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::fetcher::record::{BrokerFlow, DailyBar, InstitutionalFlow, MarginBalance, SblActivity};

/// FinMind 開放資料
pub mod finmind;
/// 台灣期貨交易所
pub mod taifex;
/// 台灣證券交易所
pub mod twse;
/// 雅虎財經
pub mod yahoo;

/// 個股日線與籌碼資料來源
#[async_trait]
pub trait StockChips: Send + Sync {
    async fn daily_bars(
        &self,
        stock_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>>;

    async fn institutional(
        &self,
        stock_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<InstitutionalFlow>>;

    async fn margins(
        &self,
        stock_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MarginBalance>>;

    async fn short_sale_balances(
        &self,
        stock_symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SblActivity>>;

    /// 是否能查詢券商分點，不能時完全不發出請求
    fn has_broker_access(&self) -> bool;

    async fn broker_flows(&self, stock_symbol: &str, date: NaiveDate) -> Result<Vec<BrokerFlow>>;
}
