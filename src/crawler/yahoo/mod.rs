//! # Yahoo 財經採集模組
//!
//! 透過 Yahoo 財經 chart API 取得國際指標的日收盤價：
//! 美債10年殖利率 (`^TNX`)、黃金期貨 (`GC=F`)、美元/台幣 (`TWD=X`)、
//! 費城半導體指數 (`^SOX`) 與恐慌指數 (`^VIX`)。
//!
//! - 來源域名：`query1.finance.yahoo.com`
//! - 回應格式：JSON，收盤價可能為 null（該時段無成交）

/// 日線圖表資料
pub mod chart;

/// Yahoo 財經 chart API 主機域名
const HOST: &str = "query1.finance.yahoo.com";
