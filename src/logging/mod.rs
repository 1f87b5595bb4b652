use std::{fmt::Write as _, thread};

use chrono::{format::DelayedFormat, DateTime, Local};
use once_cell::sync::Lazy;
use strum::Display;
use tokio::sync::{mpsc, oneshot};

use crate::logging::rotate::Rotate;

pub mod rotate;

/// 累積到這個大小才寫入檔案
const BATCH_SIZE: usize = 4096;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("risk_monitor"));

#[derive(Debug, Copy, Clone, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Level {
    Info,
    Warn,
    Error,
    Debug,
}

enum Message {
    Line {
        level: Level,
        msg: String,
        created_at: DateTime<Local>,
    },
    Flush(oneshot::Sender<()>),
}

pub struct Logger {
    writer: mpsc::UnboundedSender<Message>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        let mut rotate = Rotate::new(format!("log/%Y-%m-%d-{}.log", log_name));

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut batch = String::with_capacity(BATCH_SIZE);

            while let Some(received) = rx.blocking_recv() {
                match received {
                    Message::Line {
                        level,
                        msg,
                        created_at,
                    } => {
                        if writeln!(
                            &mut batch,
                            "{} {} {}\r",
                            created_at.format("%F %X%.6f"),
                            level,
                            msg
                        )
                        .is_err()
                        {
                            continue;
                        }

                        if rx.is_empty() || batch.len() >= BATCH_SIZE {
                            write_batch(&mut rotate, &mut batch);
                        }
                    }
                    Message::Flush(ack) => {
                        write_batch(&mut rotate, &mut batch);
                        rotate.flush();
                        let _ = ack.send(());
                    }
                }
            }
        });

        Logger { writer: tx }
    }

    pub fn info(&self, msg: String) {
        self.send(Level::Info, msg);
    }

    pub fn warn(&self, msg: String) {
        self.send(Level::Warn, msg);
    }

    pub fn error(&self, msg: String) {
        self.send(Level::Error, msg);
    }

    pub fn debug(&self, msg: String) {
        self.send(Level::Debug, msg);
    }

    fn send(&self, level: Level, msg: String) {
        let line = Message::Line {
            level,
            msg,
            created_at: Local::now(),
        };

        if let Err(why) = self.writer.send(line) {
            error_console(why.to_string());
        }
    }

    /// 等待目前排隊中的訊息都寫入檔案
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.writer.send(Message::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

fn write_batch(rotate: &mut Rotate, batch: &mut String) {
    if batch.is_empty() {
        return;
    }

    if let Err(why) = rotate.write_msg(Local::now(), batch.as_bytes()) {
        error_console(format!(
            "Failed to write to log file. because:{:#?}\r\nmsg:{}",
            why, batch
        ));
    }

    batch.clear();
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

/// 程式結束前呼叫，確保日誌不會遺失
pub async fn flush() {
    LOGGER.flush().await;
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn warn_console(log: String) {
    println!(
        "{} Warn {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flush_after_write() {
        let logger = Logger::new("logging-test");
        logger.info("開始 test_flush_after_write".to_string());
        logger.debug(format!("level: {}", Level::Debug));
        logger.flush().await;

        let file = Local::now()
            .format("log/%Y-%m-%d-logging-test.log")
            .to_string();
        let content = std::fs::read_to_string(file).unwrap_or_default();
        assert!(content.contains("INFO 開始 test_flush_after_write"));
        assert!(content.contains("DEBUG level: DEBUG"));
    }
}
