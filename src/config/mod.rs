use std::{env, path::PathBuf, str::FromStr};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::logging;

/// 觀察清單
pub mod watchlist;

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub finmind: FinMind,
    #[serde(default)]
    pub watchlist: Watchlist,
    #[serde(default)]
    pub report: Report,
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub history: History,
}

const FINMIND_TOKEN: &str = "FINMIND_TOKEN";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct FinMind {
    /// sponsor 會員的 token，空字串代表未提供
    #[serde(default)]
    pub token: String,
}

const WATCHLIST_PATH: &str = "WATCHLIST_PATH";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Watchlist {
    #[serde(default = "default_watchlist_path")]
    pub path: String,
}

impl Default for Watchlist {
    fn default() -> Self {
        Watchlist {
            path: default_watchlist_path(),
        }
    }
}

fn default_watchlist_path() -> String {
    "watchlist.json".to_string()
}

const REPORT_OUTPUT_DIR: &str = "REPORT_OUTPUT_DIR";
const REPORT_JSON_DIR: &str = "REPORT_JSON_DIR";
const REPORT_STOCK_ROWS: &str = "REPORT_STOCK_ROWS";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Report {
    /// xlsx 與 csv 的輸出目錄
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// excel_to_json 批次模式的輸出目錄
    #[serde(default = "default_json_dir")]
    pub json_dir: String,
    /// 個股籌碼表每檔股票列出最近幾個交易日
    #[serde(default = "default_stock_rows")]
    pub stock_rows: usize,
}

impl Default for Report {
    fn default() -> Self {
        Report {
            output_dir: default_output_dir(),
            json_dir: default_json_dir(),
            stock_rows: default_stock_rows(),
        }
    }
}

fn default_output_dir() -> String {
    "monitor_xlsx".to_string()
}

fn default_json_dir() -> String {
    "json".to_string()
}

fn default_stock_rows() -> usize {
    5
}

const REQUEST_INTERVAL_MS: &str = "REQUEST_INTERVAL_MS";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Http {
    /// 每次請求後固定等待的毫秒數
    #[serde(default = "default_request_interval_ms")]
    pub request_interval_ms: u64,
}

impl Default for Http {
    fn default() -> Self {
        Http {
            request_interval_ms: default_request_interval_ms(),
        }
    }
}

fn default_request_interval_ms() -> u64 {
    1500
}

const HISTORY_DAYS: &str = "HISTORY_DAYS";
const HISTORY_BUFFER_DAYS: &str = "HISTORY_BUFFER_DAYS";
const HISTORY_LOOKBACK_DAYS: &str = "HISTORY_LOOKBACK_DAYS";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct History {
    /// 大盤歷史統計所需的交易日數
    #[serde(default = "default_history_days")]
    pub days: usize,
    /// 為了避開休市日額外多抓的工作日數
    #[serde(default = "default_buffer_days")]
    pub buffer_days: usize,
    /// 個股日線往回抓取的日曆天數
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
}

impl Default for History {
    fn default() -> Self {
        History {
            days: default_history_days(),
            buffer_days: default_buffer_days(),
            lookback_days: default_lookback_days(),
        }
    }
}

fn default_history_days() -> usize {
    20
}

fn default_buffer_days() -> usize {
    15
}

fn default_lookback_days() -> i64 {
    60
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| match App::get() {
    Ok(app) => app,
    Err(why) => {
        logging::error_console(format!(
            "I can't read the config context because {:?}",
            why
        ));
        App::default().override_with_env()
    }
});

impl App {
    fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::default().override_with_env())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(token) = env::var(FINMIND_TOKEN) {
            self.finmind.token = token;
        }

        if let Ok(path) = env::var(WATCHLIST_PATH) {
            self.watchlist.path = path;
        }

        if let Ok(dir) = env::var(REPORT_OUTPUT_DIR) {
            self.report.output_dir = dir;
        }

        if let Ok(dir) = env::var(REPORT_JSON_DIR) {
            self.report.json_dir = dir;
        }

        if let Ok(rows) = env::var(REPORT_STOCK_ROWS) {
            self.report.stock_rows = usize::from_str(&rows).unwrap_or(self.report.stock_rows);
        }

        if let Ok(ms) = env::var(REQUEST_INTERVAL_MS) {
            self.http.request_interval_ms =
                u64::from_str(&ms).unwrap_or(self.http.request_interval_ms);
        }

        if let Ok(days) = env::var(HISTORY_DAYS) {
            self.history.days = usize::from_str(&days).unwrap_or(self.history.days);
        }

        if let Ok(days) = env::var(HISTORY_BUFFER_DAYS) {
            self.history.buffer_days = usize::from_str(&days).unwrap_or(self.history.buffer_days);
        }

        if let Ok(days) = env::var(HISTORY_LOOKBACK_DAYS) {
            self.history.lookback_days =
                i64::from_str(&days).unwrap_or(self.history.lookback_days);
        }

        self
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
