use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Result;
use clap::Parser;
use tw_risk_monitor::{config::SETTINGS, logging, report::json};

/// 將風險監控報表 (.xlsx) 轉成 json
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// xlsx 檔案或資料夾，預設為報表輸出目錄（批次轉換）
    input: Option<PathBuf>,

    /// 單一檔案模式的輸出路徑，預設為 json 目錄下的同名檔案
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 縮排空白數
    #[arg(long, default_value_t = 2)]
    indent: usize,

    /// 批次模式下即使 json 已是最新也重新轉換
    #[arg(short, long)]
    force: bool,
}

fn run(cli: Cli) -> Result<()> {
    let json_dir = Path::new(&SETTINGS.report.json_dir);
    let input = cli
        .input
        .unwrap_or_else(|| PathBuf::from(&SETTINGS.report.output_dir));

    if input.is_dir() {
        let summary = json::convert_dir(&input, json_dir, cli.indent, cli.force)?;
        logging::info_console(format!(
            "轉換完成: {} 個, 跳過: {} 個, 失敗: {} 個",
            summary.converted, summary.skipped, summary.failed
        ));
        return Ok(());
    }

    let output = match cli.output {
        Some(output) => output,
        None => json::json_path(&input, json_dir)?,
    };
    json::convert_file(&input, &output, cli.indent)?;
    logging::info_console(format!("轉換完成，已儲存至 {}", output.display()));

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let code = match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(why) => {
            logging::error_console(format!("轉換失敗: {:?}", why));
            ExitCode::FAILURE
        }
    };

    logging::flush().await;
    code
}
