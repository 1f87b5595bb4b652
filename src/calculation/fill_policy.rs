//! 券商分點與借券資料缺少時的模擬補值。
//!
//! 種子為 `"{股票代號}_{YYYYMMDD}_{指標}_{salt}"` 的 SHA-256，取前 8 個位元組
//! 以 big-endian 轉成 u64 後映射到 [0, 1)，同一檔股票同一天同一指標在任何平台
//! 重跑都會得到相同的值。

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use strum::{AsRefStr, Display};

/// 預設 salt
pub const DEFAULT_SALT: u64 = 42;

/// 需要模擬補值的指標
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, AsRefStr)]
pub enum Metric {
    /// 買賣券商差，[-50, 50] 的整數
    #[strum(serialize = "broker_diff")]
    BrokerDiff,
    /// 5 日籌碼集中度，[-10, 10] 取到小數第二位
    #[strum(serialize = "concentration_5d")]
    Concentration5d,
    /// 沒有任何前值時的借券賣出餘額起始值，[0, 1_000_000]
    #[strum(serialize = "sbl_base")]
    SblBase,
    /// 借券賣出餘額單日變動，前一日餘額的 ±2%
    #[strum(serialize = "sbl_delta")]
    SblDelta,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FillPolicy {
    salt: u64,
}

impl Default for FillPolicy {
    fn default() -> Self {
        FillPolicy::new(DEFAULT_SALT)
    }
}

impl FillPolicy {
    pub fn new(salt: u64) -> Self {
        FillPolicy { salt }
    }

    fn digest(&self, instrument: &str, date: NaiveDate, metric: Metric) -> [u8; 8] {
        let mut hasher = Sha256::new();
        hasher.update(
            format!(
                "{}_{}_{}_{}",
                instrument,
                date.format("%Y%m%d"),
                metric,
                self.salt
            )
            .as_bytes(),
        );
        let hash = hasher.finalize();

        let mut head = [0u8; 8];
        head.copy_from_slice(&hash[..8]);
        head
    }

    /// 種子的十六進位字串，除錯時對照用
    pub fn seed_hex(&self, instrument: &str, date: NaiveDate, metric: Metric) -> String {
        hex::encode(self.digest(instrument, date, metric))
    }

    /// [0, 1) 之間的值，取高位 53 bits 保證 f64 精度
    pub fn unit(&self, instrument: &str, date: NaiveDate, metric: Metric) -> f64 {
        let x = u64::from_be_bytes(self.digest(instrument, date, metric));
        (x >> 11) as f64 / (1u64 << 53) as f64
    }

    /// [lo, hi) 的均勻分布
    pub fn uniform(
        &self,
        instrument: &str,
        date: NaiveDate,
        metric: Metric,
        lo: f64,
        hi: f64,
    ) -> f64 {
        lo + self.unit(instrument, date, metric) * (hi - lo)
    }

    /// [lo, hi] 的均勻整數
    pub fn uniform_int(
        &self,
        instrument: &str,
        date: NaiveDate,
        metric: Metric,
        lo: i64,
        hi: i64,
    ) -> i64 {
        let span = (hi - lo + 1) as f64;
        let offset = (self.unit(instrument, date, metric) * span).floor() as i64;
        (lo + offset).min(hi)
    }
}
