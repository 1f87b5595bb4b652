//! 個股進階籌碼指標。
//!
//! 每個交易日產生一列 [`IndicatorRow`]：
//! - 少於 5 個交易日的日期不產生
//! - 5~19 個交易日產生但 `partial = true`，VWAP 與 MA20 乖離為 None
//! - 券商分點或借券資料缺少時由 [`FillPolicy`] 補值，並標記對應的模擬欄位

use chrono::NaiveDate;
use hashbrown::HashMap;
use serde::Serialize;

use crate::{
    calculation::{
        evaluation,
        fill_policy::{FillPolicy, Metric},
        rolling::round2,
    },
    declare::{ChipsRating, DataSource},
    fetcher::record::{BrokerFlow, DailyBar, SblActivity, StockSeries},
    logging,
    util::map::index_by_key,
};

/// 短窗口
pub const SHORT_WINDOW: usize = 5;
/// 長窗口
pub const LONG_WINDOW: usize = 20;
/// 籌碼集中度取前後各幾名券商
const TOP_BROKERS: usize = 15;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub instrument: String,
    pub name: String,
    pub date: NaiveDate,

    pub close: f64,
    /// 與前一交易日收盤比較的漲跌幅 (%)
    pub pct_change: Option<f64>,
    /// 成交量（張）
    pub volume: i64,
    pub foreign_daily: Option<i64>,
    pub foreign_5d_sum: Option<i64>,
    pub trust_daily: Option<i64>,
    pub trust_5d_sum: Option<i64>,
    pub dealer_daily: Option<i64>,
    pub margin_daily_change: Option<i64>,
    pub margin_5d_sum: Option<i64>,
    /// 借券賣出餘額增減（張）
    pub lending_daily_change: Option<i64>,
    pub dist_ma20: Option<f64>,
    pub chips_rating: ChipsRating,

    pub broker_buy_sell_diff: i64,
    pub chip_concentration_5d: Option<f64>,
    /// 借券賣出餘額（股）
    pub sbl_sell_balance: i64,
    pub short_cover_days: Option<f64>,
    pub vwap_20d: Option<f64>,
    pub vwap_bias: Option<f64>,

    pub broker_simulated: bool,
    pub concentration_simulated: bool,
    pub sbl_simulated: bool,
    pub data_source: DataSource,
    /// 不足 20 個交易日
    pub partial: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    policy: FillPolicy,
}

impl IndicatorEngine {
    pub fn new(policy: FillPolicy) -> Self {
        IndicatorEngine { policy }
    }

    /// `series.bars` 必須已依日期由舊到新排序
    pub fn compute(&self, series: &StockSeries) -> Vec<IndicatorRow> {
        let bars = &series.bars;
        let code = series.entry.code.as_str();
        let institutional = index_by_key(&series.institutional);
        let margins = index_by_key(&series.margins);
        let sbl = index_by_key(&series.sbl);
        let broker_nets = series.broker_flows.as_ref().map(|flows| net_by_date(flows));
        let balances = self.sbl_balances(code, bars, &sbl);

        let mut rows = Vec::with_capacity(bars.len().saturating_sub(SHORT_WINDOW - 1));

        for (i, bar) in bars.iter().enumerate() {
            let sessions = i + 1;
            if sessions < SHORT_WINDOW {
                continue;
            }

            let short = &bars[sessions - SHORT_WINDOW..sessions];
            let long = (sessions >= LONG_WINDOW).then(|| &bars[sessions - LONG_WINDOW..sessions]);
            let short_volume: i64 = short.iter().map(|b| b.volume).sum();

            let (broker_buy_sell_diff, broker_simulated) =
                match broker_nets.as_ref().and_then(|n| n.get(&bar.date)) {
                    Some(nets) => (buy_sell_diff(nets), false),
                    None => (
                        self.policy
                            .uniform_int(code, bar.date, Metric::BrokerDiff, -50, 50),
                        true,
                    ),
                };

            let (chip_concentration_5d, concentration_simulated) =
                match broker_nets.as_ref().and_then(|n| window_nets(n, short)) {
                    Some(nets) => (concentration(&nets, short_volume), false),
                    None => (
                        Some(round2(self.policy.uniform(
                            code,
                            bar.date,
                            Metric::Concentration5d,
                            -10.0,
                            10.0,
                        ))),
                        true,
                    ),
                };

            let (sbl_sell_balance, sbl_simulated) = balances[i];
            let avg_volume = short_volume as f64 / SHORT_WINDOW as f64;
            let short_cover_days = (avg_volume > 0.0)
                .then(|| round2((sbl_sell_balance as f64 / avg_volume).max(0.0)));

            let vwap_20d = long.and_then(vwap);
            let vwap_bias = vwap_20d
                .filter(|v| *v != 0.0)
                .map(|v| round2((bar.close - v) / v * 100.0));

            let dist_ma20 = long.map(|w| {
                let ma20 = w.iter().map(|b| b.close).sum::<f64>() / LONG_WINDOW as f64;
                round2((bar.close - ma20) / ma20 * 100.0)
            });

            // 5 個交易日都有資料才加總，缺任何一天即為 None
            let window_sum = |pick: &dyn Fn(NaiveDate) -> Option<i64>| -> Option<i64> {
                short.iter().map(|b| pick(b.date)).sum()
            };
            let foreign = |d: NaiveDate| institutional.get(&d).map(|f| to_lots(f.foreign_net));
            let trust = |d: NaiveDate| institutional.get(&d).map(|f| to_lots(f.trust_net));
            let margin = |d: NaiveDate| margins.get(&d).map(|m| m.margin_change());

            let foreign_5d_sum = window_sum(&foreign);
            let trust_5d_sum = window_sum(&trust);
            let margin_5d_sum = window_sum(&margin);

            let lending_daily_change = sbl.get(&bar.date).map(|record| {
                let previous = record
                    .previous_balance
                    .or_else(|| i.checked_sub(1).map(|p| balances[p].0))
                    .unwrap_or(sbl_sell_balance);
                to_lots(sbl_sell_balance - previous)
            });

            let data_source = data_source(
                [broker_simulated, concentration_simulated, sbl_simulated],
                vwap_20d.is_some(),
            );

            rows.push(IndicatorRow {
                instrument: code.to_string(),
                name: series.entry.name.clone(),
                date: bar.date,
                close: bar.close,
                pct_change: i
                    .checked_sub(1)
                    .map(|p| bars[p].close)
                    .filter(|prev| *prev != 0.0)
                    .map(|prev| round2((bar.close - prev) / prev * 100.0)),
                volume: to_lots(bar.volume),
                foreign_daily: foreign(bar.date),
                foreign_5d_sum,
                trust_daily: trust(bar.date),
                trust_5d_sum,
                dealer_daily: institutional.get(&bar.date).map(|f| to_lots(f.dealer_net)),
                margin_daily_change: margin(bar.date),
                margin_5d_sum,
                lending_daily_change,
                dist_ma20,
                chips_rating: evaluation::rate_chips(
                    foreign_5d_sum.map(|v| v as f64),
                    trust_5d_sum.map(|v| v as f64),
                    margin_5d_sum.map(|v| v as f64),
                ),
                broker_buy_sell_diff,
                chip_concentration_5d,
                sbl_sell_balance,
                short_cover_days,
                vwap_20d: vwap_20d.map(round2),
                vwap_bias,
                broker_simulated,
                concentration_simulated,
                sbl_simulated,
                data_source,
                partial: sessions < LONG_WINDOW,
            });
        }

        let simulated = rows.iter().filter(|r| r.data_source != DataSource::Fetched).count();
        if simulated > 0 {
            logging::debug_file_async(format!(
                "{} filled {} of {} rows by simulation (seed {})",
                code,
                simulated,
                rows.len(),
                bars.last()
                    .map(|b| self.policy.seed_hex(code, b.date, Metric::BrokerDiff))
                    .unwrap_or_default()
            ));
        }

        rows
    }

    /// 逐日推算借券賣出餘額與是否為模擬值
    ///
    /// - 有當日餘額：直接採用
    /// - 有異動但沒有餘額：前日餘額 + 借券賣出 - 還券 + 調整
    /// - 沒有資料：前一日餘額加上 ±2% 的模擬變動
    /// - 完全沒有前值：由 [0, 1_000_000] 模擬起始值
    ///
    /// 真實餘額一出現就取代模擬的前值
    fn sbl_balances(
        &self,
        code: &str,
        bars: &[DailyBar],
        sbl: &HashMap<NaiveDate, &SblActivity>,
    ) -> Vec<(i64, bool)> {
        let mut balances: Vec<(i64, bool)> = Vec::with_capacity(bars.len());

        for bar in bars {
            let previous = balances.last().copied();
            let simulated_base = || {
                (
                    self.policy
                        .uniform(code, bar.date, Metric::SblBase, 0.0, 1_000_000.0)
                        .round() as i64,
                    true,
                )
            };

            let current = match sbl.get(&bar.date) {
                Some(SblActivity {
                    current_balance: Some(balance),
                    ..
                }) => (*balance, false),
                Some(record) => {
                    let (base, simulated) = record
                        .previous_balance
                        .map(|b| (b, false))
                        .or(previous)
                        .unwrap_or_else(simulated_base);
                    (
                        (base + record.short_sales - record.returns + record.adjustments).max(0),
                        simulated,
                    )
                }
                None => {
                    let (base, _) = previous.unwrap_or_else(simulated_base);
                    let delta = self.policy.uniform(code, bar.date, Metric::SblDelta, -0.02, 0.02)
                        * base as f64;
                    (((base as f64 + delta).round() as i64).max(0), true)
                }
            };

            balances.push(current);
        }

        balances
    }
}

/// 沒有任何模擬值為 fetched；模擬指標全數模擬且沒有可計算的 VWAP 為 simulated
fn data_source(simulated: [bool; 3], has_vwap: bool) -> DataSource {
    if simulated.iter().all(|s| !s) {
        DataSource::Fetched
    } else if simulated.iter().all(|s| *s) && !has_vwap {
        DataSource::Simulated
    } else {
        DataSource::Partial
    }
}

/// 每日每家券商的淨買賣股數，同一券商多筆（不同成交價）合併
fn net_by_date(flows: &[BrokerFlow]) -> HashMap<NaiveDate, HashMap<String, i64>> {
    let mut result: HashMap<NaiveDate, HashMap<String, i64>> = HashMap::new();

    for flow in flows {
        *result
            .entry(flow.date)
            .or_default()
            .entry(flow.broker_id.clone())
            .or_default() += flow.net();
    }

    result.retain(|_, nets| !nets.is_empty());
    result
}

/// 淨買超券商數 - 淨賣超券商數
fn buy_sell_diff(nets: &HashMap<String, i64>) -> i64 {
    let buyers = nets.values().filter(|n| **n > 0).count() as i64;
    let sellers = nets.values().filter(|n| **n < 0).count() as i64;
    buyers - sellers
}

/// 5 個交易日都有分點資料時，回傳各券商 5 日淨買賣合計
fn window_nets(
    by_date: &HashMap<NaiveDate, HashMap<String, i64>>,
    window: &[DailyBar],
) -> Option<HashMap<String, i64>> {
    let mut total: HashMap<String, i64> = HashMap::new();

    for bar in window {
        for (broker, net) in by_date.get(&bar.date)? {
            *total.entry(broker.clone()).or_default() += net;
        }
    }

    Some(total)
}

/// (前 15 名淨買合計 - |後 15 名淨賣合計|) / 5 日成交量 × 100
///
/// 依 5 日淨買賣由大到小排序後取頭尾各 15 家，券商不足 30 家時頭尾會重疊
fn concentration(nets: &HashMap<String, i64>, volume: i64) -> Option<f64> {
    if volume == 0 {
        return None;
    }

    let mut sorted: Vec<i64> = nets.values().copied().collect();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let take = sorted.len().min(TOP_BROKERS);
    let top: i64 = sorted[..take].iter().sum();
    let bottom: i64 = sorted[sorted.len() - take..].iter().sum();

    Some(round2((top - bottom.abs()) as f64 / volume as f64 * 100.0))
}

/// Σ(收盤 × 成交量) / Σ成交量
fn vwap(window: &[DailyBar]) -> Option<f64> {
    let volume: i64 = window.iter().map(|b| b.volume).sum();
    if volume == 0 {
        return None;
    }

    let turnover: f64 = window.iter().map(|b| b.close * b.volume as f64).sum();
    Some(turnover / volume as f64)
}

/// 股 => 張
fn to_lots(shares: i64) -> i64 {
    (shares as f64 / 1000.0).round() as i64
}
