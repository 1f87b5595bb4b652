use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;

use tw_risk_monitor::{
    calculation::chip_indicator::IndicatorEngine,
    config::{watchlist, SETTINGS},
    crawler::finmind::FinMind,
    fetcher::Fetcher,
    logging,
    report::{self, assembler},
    util::datetime,
};

/// 台股風險與個股籌碼監控報表
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// 報表日期 YYYYMMDD，預設今天，週末會往前找到週五
    #[arg(long)]
    date: Option<String>,

    /// 輸出的 xlsx 檔名，預設 risk_report_YYYYMMDD.xlsx
    #[arg(long)]
    output: Option<String>,

    /// FinMind token，未提供時使用 FINMIND_TOKEN 或 app.json
    #[arg(long)]
    token: Option<String>,

    /// 另外輸出每個區段的 csv
    #[arg(long)]
    csv: bool,

    /// 觀察清單路徑
    #[arg(long)]
    watchlist: Option<String>,

    /// 輸出目錄
    #[arg(long)]
    output_dir: Option<String>,
}

impl Cli {
    fn report_date(&self) -> Result<NaiveDate> {
        let date = match &self.date {
            Some(s) => datetime::parse_yyyymmdd(s)?,
            None => Local::now().date_naive(),
        };

        Ok(datetime::trading_date(date))
    }

    /// 命令列優先，其次為環境變數與設定檔
    fn token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| Some(SETTINGS.finmind.token.clone()))
            .filter(|t| !t.trim().is_empty())
    }

    fn output_path(&self, date: NaiveDate) -> PathBuf {
        let dir = self
            .output_dir
            .as_deref()
            .unwrap_or(SETTINGS.report.output_dir.as_str());
        let file = self
            .output
            .clone()
            .unwrap_or_else(|| format!("risk_report_{}.xlsx", date.format("%Y%m%d")));

        // 絕對路徑會取代輸出目錄
        Path::new(dir).join(file)
    }
}

async fn run(cli: Cli) -> Result<()> {
    let date = cli.report_date()?;
    let watchlist_path = cli
        .watchlist
        .clone()
        .unwrap_or_else(|| SETTINGS.watchlist.path.clone());
    let entries = watchlist::load(&watchlist_path)?;

    let token = cli.token();
    if token.is_none() {
        logging::warn_console(
            "未提供 FinMind token，券商分點資料將以模擬值填補".to_string(),
        );
    }
    let source = FinMind::new(token);

    logging::info_console(format!(
        "報表日期 {}，觀察清單 {} 檔",
        date,
        entries.len()
    ));
    let fetched = Fetcher::new(date, &source).run(&entries).await;

    let engine = IndicatorEngine::default();
    let stocks: Vec<_> = fetched
        .stocks
        .iter()
        .filter_map(|s| s.series())
        .map(|series| engine.compute(series))
        .collect();

    let failed: Vec<String> = fetched
        .failed()
        .map(|s| format!("{} {}", s.entry().code, s.entry().name))
        .collect();
    if !failed.is_empty() {
        logging::warn_console(format!("抓取失敗的股票: {}", failed.join(", ")));
    }

    let report = assembler::assemble(
        date,
        &fetched.market,
        &fetched.history,
        &stocks,
        SETTINGS.report.stock_rows,
    );

    let output = cli.output_path(date);
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    report::xlsx::write(&report, &output)?;
    logging::info_console(format!("報表已儲存至 {}", output.display()));

    if cli.csv {
        for path in report::csv::write(&report, &output)? {
            logging::info_console(format!("csv 已儲存至 {}", path.display()));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(why) => {
            logging::error_console(format!("執行失敗: {:?}", why));
            ExitCode::FAILURE
        }
    };

    logging::flush().await;
    code
}
