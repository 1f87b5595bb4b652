use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, TimeDelta};
use rayon::prelude::*;

use crate::logging;

/// 單檔最大 10 MB
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;
/// 保留 7 天
const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// 依日期與檔案大小輪轉的日誌檔
///
/// 檔名由 `fn_pattern` 經 chrono 格式化而成，例如 `log/%Y-%m-%d-app.log`。
/// 同一天內超過 `max_size` 時改寫入 `log/2026-01-23-app.1.log`、`.2.log`…
pub struct Rotate {
    fn_pattern: String,
    /// 由日期決定的檔名，不含世代編號
    base_fn: String,
    generation: u32,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    max_size: u64,
    max_age: TimeDelta,
}

impl Rotate {
    pub fn new(fn_pattern: String) -> Self {
        Self::with_options(fn_pattern, DEFAULT_MAX_SIZE, DEFAULT_MAX_AGE_DAYS)
    }

    pub fn with_options(fn_pattern: String, max_size: u64, max_age_days: i64) -> Self {
        Rotate {
            fn_pattern,
            base_fn: String::new(),
            generation: 0,
            writer: None,
            current_size: 0,
            max_size,
            max_age: TimeDelta::try_days(max_age_days).unwrap_or(TimeDelta::days(7)),
        }
    }

    /// 寫入一段訊息，必要時切換到新的日期檔或下一個世代
    pub fn write_msg(&mut self, now: DateTime<Local>, msg: &[u8]) -> Result<()> {
        let base_fn = now.format(&self.fn_pattern).to_string();

        if base_fn != self.base_fn {
            self.base_fn = base_fn;
            self.generation = 0;
            self.open()?;
            self.cleanup(now);
        } else if self.current_size > 0
            && self.current_size + msg.len() as u64 > self.max_size
        {
            self.generation += 1;
            self.open()?;
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("log file {} is not opened", self.base_fn))?;
        writer.write_all(msg)?;
        writer.flush()?;
        self.current_size += msg.len() as u64;

        Ok(())
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }

    pub fn current_file(&self) -> String {
        generation_fn(&self.base_fn, self.generation)
    }

    fn open(&mut self) -> Result<()> {
        self.flush();

        let filename = self.current_file();
        if let Some(parent) = Path::new(&filename).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&filename)?;
        self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.writer = Some(BufWriter::with_capacity(4096, file));

        Ok(())
    }

    /// 刪除同目錄下修改時間早於 max_age 的檔案
    fn cleanup(&self, now: DateTime<Local>) {
        let dir = match Path::new(&self.base_fn).parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(why) => {
                logging::error_console(format!(
                    "Failed to read_dir({}) because {:?}",
                    dir.display(),
                    why
                ));
                return;
            }
        };

        let cut_off = (now - self.max_age).timestamp().max(0) as u64;
        let expired: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                fs::metadata(path)
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .is_some_and(|d| d.as_secs() <= cut_off)
            })
            .collect();

        expired
            .par_iter()
            .with_min_len(num_cpus::get())
            .for_each(|path| {
                if let Err(why) = fs::remove_file(path) {
                    logging::error_console(format!(
                        "couldn't remove the file({}). because {:?}",
                        path.display(),
                        why
                    ));
                }
            });
    }
}

impl Drop for Rotate {
    fn drop(&mut self) {
        self.flush();
    }
}

/// generation = 0: "log/2026-01-23-app.log"
/// generation = 2: "log/2026-01-23-app.2.log"
fn generation_fn(base_fn: &str, generation: u32) -> String {
    if generation == 0 {
        return base_fn.to_string();
    }

    let path = Path::new(base_fn);
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("log");

    parent
        .join(format!("{}.{}.{}", stem, generation, ext))
        .to_string_lossy()
        .to_string()
}
