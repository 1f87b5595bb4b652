/// 籌碼指標與風險燈號的計算
pub mod calculation;
/// 設定檔與觀察清單
pub mod config;
/// 各資料來源的爬蟲
pub mod crawler;
pub mod declare;
/// 單次執行的資料抓取
pub mod fetcher;
/// 日誌
pub mod logging;
/// 報表組合與輸出
pub mod report;
pub mod util;
