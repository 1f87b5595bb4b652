use chrono::NaiveDate;
use strum::IntoEnumIterator;

use crate::{
    calculation::{
        chip_indicator::IndicatorRow,
        evaluation,
        rolling::WindowStats,
    },
    declare::{MarketIndicator, RiskLevel},
    fetcher::{MarketHistory, MarketSnapshot},
    report::{Cell, Report, Section, SectionKind, Tone},
};

const OVERVIEW_HEADERS: &[&str] = &[
    "類別",
    "指標",
    "當日數值",
    "單位",
    "單日變動(%)",
    "風險燈號",
    "5日平均",
    "5日總和",
    "20日平均",
    "20日總和",
];

const DETAIL_HEADERS: &[&str] = &[
    "類別",
    "指標",
    "單位",
    "5日平均",
    "5日總和",
    "20日平均",
    "20日總和",
    "樣本數",
];

const CHIPS_HEADERS: &[&str] = &[
    "日期",
    "股票代號",
    "股票名稱",
    "收盤價",
    "漲跌幅(%)",
    "成交量(張)",
    "外資當日(張)",
    "外資5日累計",
    "投信當日(張)",
    "投信5日累計",
    "自營商當日(張)",
    "融資增減(張)",
    "融資5日累計",
    "借券增減(張)",
    "MA20乖離(%)",
    "籌碼評價",
    "買賣券商差",
    "籌碼集中度5D(%)",
    "借券賣出餘額",
    "短回補天數",
    "VWAP20D",
    "VWAP乖離(%)",
    "資料來源",
    "買賣券商差模擬",
    "籌碼集中度模擬",
    "借券餘額模擬",
    "資料不足20日",
];

/// 總覽表的一列
#[derive(Debug, Clone, PartialEq)]
pub struct OverviewIndicator {
    pub indicator: MarketIndicator,
    pub value: Option<f64>,
    pub change_pct: Option<f64>,
    pub risk: RiskLevel,
    pub stats: Option<WindowStats>,
}

/// 詳細數據表的一列
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStat {
    pub group: &'static str,
    pub name: &'static str,
    pub unit: &'static str,
    pub stats: WindowStats,
}

/// 大盤指標對應的歷史統計
fn stats_for(indicator: MarketIndicator, history: &MarketHistory) -> Option<WindowStats> {
    match indicator {
        MarketIndicator::ForeignNet => Some(WindowStats::of(&history.foreign_net())),
        MarketIndicator::TrustNet => Some(WindowStats::of(&history.trust_net())),
        MarketIndicator::TotalNet => Some(WindowStats::of(&history.total_net())),
        MarketIndicator::MarginChange => Some(WindowStats::of(&history.margin_changes())),
        MarketIndicator::PutCallRatio => {
            Some(WindowStats::avg_5d_only(&history.put_call_values()))
        }
        MarketIndicator::ForeignFutures => {
            Some(WindowStats::avg_5d_int(&history.foreign_futures_values()))
        }
        _ => None,
    }
}

pub fn overview_indicators(
    market: &MarketSnapshot,
    history: &MarketHistory,
) -> Vec<OverviewIndicator> {
    MarketIndicator::iter()
        .map(|indicator| {
            let quote = market.quote(indicator);
            let value = quote.map(|q| q.value);
            OverviewIndicator {
                indicator,
                value,
                change_pct: quote.and_then(|q| q.change_pct),
                risk: evaluation::assess_risk(indicator, value),
                stats: stats_for(indicator, history),
            }
        })
        .collect()
}

pub fn history_stats(history: &MarketHistory) -> Vec<HistoryStat> {
    vec![
        HistoryStat {
            group: "法人",
            name: "外資",
            unit: "億",
            stats: WindowStats::of(&history.foreign_net()),
        },
        HistoryStat {
            group: "法人",
            name: "投信",
            unit: "億",
            stats: WindowStats::of(&history.trust_net()),
        },
        HistoryStat {
            group: "法人",
            name: "三大法人合計",
            unit: "億",
            stats: WindowStats::of(&history.total_net()),
        },
        HistoryStat {
            group: "信用",
            name: "融資變化",
            unit: "億",
            stats: WindowStats::of(&history.margin_changes()),
        },
        HistoryStat {
            group: "選擇權",
            name: "P/C Ratio",
            unit: "%",
            stats: WindowStats::avg_5d_only(&history.put_call_values()),
        },
        HistoryStat {
            group: "期貨",
            name: "外資期貨淨部位",
            unit: "口",
            stats: WindowStats::avg_5d_int(&history.foreign_futures_values()),
        },
        HistoryStat {
            group: "大盤",
            name: "加權指數成交量(億股)",
            unit: "億股",
            stats: WindowStats::of(&history.index_volumes()),
        },
    ]
}

fn risk_tone(risk: RiskLevel) -> Option<Tone> {
    match risk {
        RiskLevel::Danger => Some(Tone::Red),
        RiskLevel::Safe => Some(Tone::Green),
        _ => None,
    }
}

/// 正值與負值分別使用的字色
fn sign_tone(value: Option<f64>, positive: Tone, negative: Tone) -> Option<Tone> {
    match value {
        Some(v) if v > 0.0 => Some(positive),
        Some(v) if v < 0.0 => Some(negative),
        _ => None,
    }
}

fn overview_section(date: NaiveDate, indicators: &[OverviewIndicator]) -> Section {
    let mut section = Section::new(
        SectionKind::Overview,
        format!("台股風險監控總覽 - {}", date.format("%Y-%m-%d")),
        OVERVIEW_HEADERS,
    );

    for item in indicators {
        let stats = item.stats.unwrap_or_default();
        section.rows.push(vec![
            Cell::text(item.indicator.category()),
            Cell::text(item.indicator.to_string()),
            Cell::optional(item.value),
            Cell::text(item.indicator.unit()),
            Cell::optional(item.change_pct),
            Cell::text(item.risk.to_string()).with_tone(risk_tone(item.risk)),
            Cell::optional(stats.avg_5d),
            Cell::optional(stats.sum_5d),
            Cell::optional(stats.avg_20d),
            Cell::optional(stats.sum_20d),
        ]);
    }

    section
}

fn detail_section(date: NaiveDate, stats: &[HistoryStat]) -> Section {
    let mut section = Section::new(
        SectionKind::Detail,
        format!("歷史統計數據 - {}", date.format("%Y-%m-%d")),
        DETAIL_HEADERS,
    );

    for stat in stats {
        section.rows.push(vec![
            Cell::text(stat.group),
            Cell::text(stat.name),
            Cell::text(stat.unit),
            Cell::optional(stat.stats.avg_5d),
            Cell::optional(stat.stats.sum_5d),
            Cell::optional(stat.stats.avg_20d),
            Cell::optional(stat.stats.sum_20d),
            Cell::number(stat.stats.samples as f64),
        ]);
    }

    section
}

fn chips_row(row: &IndicatorRow) -> Vec<Cell> {
    let foreign_daily = row.foreign_daily.map(|v| v as f64);

    vec![
        Cell::text(row.date.format("%Y-%m-%d").to_string()),
        Cell::text(row.instrument.as_str()),
        Cell::text(row.name.as_str()),
        Cell::number(row.close),
        Cell::optional(row.pct_change).with_tone(sign_tone(row.pct_change, Tone::Red, Tone::Green)),
        Cell::number(row.volume as f64),
        Cell::optional(foreign_daily).with_tone(sign_tone(foreign_daily, Tone::Green, Tone::Red)),
        Cell::optional_int(row.foreign_5d_sum),
        Cell::optional_int(row.trust_daily),
        Cell::optional_int(row.trust_5d_sum),
        Cell::optional_int(row.dealer_daily),
        Cell::optional_int(row.margin_daily_change),
        Cell::optional_int(row.margin_5d_sum),
        Cell::optional_int(row.lending_daily_change),
        Cell::optional(row.dist_ma20),
        Cell::text(row.chips_rating.to_string()),
        Cell::number(row.broker_buy_sell_diff as f64),
        Cell::optional(row.chip_concentration_5d).with_tone(sign_tone(
            row.chip_concentration_5d,
            Tone::Green,
            Tone::Red,
        )),
        Cell::number(row.sbl_sell_balance as f64),
        Cell::optional(row.short_cover_days),
        Cell::optional(row.vwap_20d),
        Cell::optional(row.vwap_bias),
        Cell::text(row.data_source.to_string()),
        Cell::bool(row.broker_simulated),
        Cell::bool(row.concentration_simulated),
        Cell::bool(row.sbl_simulated),
        Cell::bool(row.partial),
    ]
}

/// 依觀察清單順序，每檔股票列出最近 `stock_rows` 個交易日（日期由舊到新）
fn chips_section(date: NaiveDate, stocks: &[Vec<IndicatorRow>], stock_rows: usize) -> Section {
    let mut section = Section::new(
        SectionKind::Chips,
        format!("個股籌碼監控 - {}", date.format("%Y-%m-%d")),
        CHIPS_HEADERS,
    );

    for rows in stocks {
        let skip = rows.len().saturating_sub(stock_rows);
        section.rows.extend(rows[skip..].iter().map(chips_row));
    }

    section
}

/// 組合三個區段
///
/// `stocks` 與觀察清單同順序，抓取失敗的股票不在其中
pub fn assemble(
    date: NaiveDate,
    market: &MarketSnapshot,
    history: &MarketHistory,
    stocks: &[Vec<IndicatorRow>],
    stock_rows: usize,
) -> Report {
    Report {
        date,
        sections: vec![
            overview_section(date, &overview_indicators(market, history)),
            detail_section(date, &history_stats(history)),
            chips_section(date, stocks, stock_rows),
        ],
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Duration;
    use hashbrown::HashMap;

    use super::*;
    use crate::{
        calculation::chip_indicator::IndicatorEngine,
        config::watchlist::WatchlistEntry,
        fetcher::{
            market::MarketDay,
            record::{DailyBar, MarketFlow, Quote, StockSeries},
        },
        report::Value,
    };

    pub(crate) fn ymd(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn stock(code: &str, name: &str, count: usize) -> Vec<IndicatorRow> {
        let first = ymd(1);
        let bars = (0..count)
            .map(|i| {
                let close = 100.0 + i as f64;
                DailyBar::new(first + Duration::days(i as i64), close, close, close, close, 1_500_000)
                    .unwrap()
            })
            .collect();
        let series = StockSeries::new(
            WatchlistEntry {
                code: code.to_string(),
                name: name.to_string(),
            },
            bars,
        );
        IndicatorEngine::default().compute(&series)
    }

    /// 測試用的完整報表
    pub(crate) fn sample_report() -> Report {
        let days: Vec<MarketDay> = (1..=22)
            .map(|d| MarketDay {
                date: ymd(d),
                flow: Some(MarketFlow {
                    date: ymd(d),
                    foreign_net: Some(d as f64 * 10.0 - 100.0),
                    trust_net: Some(1.5),
                    dealer_net: Some(-0.25),
                    total_net: Some(d as f64 * 10.0 - 98.75),
                }),
                margin_change: Some(2.0),
            })
            .collect();
        let history = MarketHistory {
            days,
            put_call_ratios: (18..=22).map(|d| (ymd(d), 100.0 + d as f64)).collect(),
            foreign_futures: vec![(ymd(22), -30321)],
            index_bars: vec![],
        };
        let mut international = HashMap::new();
        international.insert(
            MarketIndicator::Vix,
            Quote {
                value: 31.2,
                change_pct: Some(-3.5),
            },
        );
        let market = MarketSnapshot::new(ymd(22), &history, international);

        let stocks = vec![stock("2330", "台積電", 25), stock("2317", "鴻海", 8)];
        assemble(ymd(22), &market, &history, &stocks, 5)
    }

    #[test]
    fn test_sections_and_order() {
        let report = sample_report();
        let names: Vec<&str> = report.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["總覽", "詳細數據", "個股籌碼"]);

        let chips = report.section(SectionKind::Chips).unwrap();
        assert_eq!(chips.headers.len(), chips.rows[0].len());
        assert_eq!(chips.rows.len(), 9);

        let codes: Vec<&Value> = chips.rows.iter().map(|r| &r[1].value).collect();
        assert!(codes[..5].iter().all(|c| **c == Value::Text("2330".to_string())));
        assert!(codes[5..].iter().all(|c| **c == Value::Text("2317".to_string())));

        let dates: Vec<&Value> = chips.rows[..5].iter().map(|r| &r[0].value).collect();
        assert_eq!(dates[0], &Value::Text("2026-01-21".to_string()));
        assert_eq!(dates[4], &Value::Text("2026-01-25".to_string()));
        assert_eq!(chips.rows[5][0].value, Value::Text("2026-01-05".to_string()));
    }

    #[test]
    fn test_overview_join() {
        let report = sample_report();
        let overview = report.section(SectionKind::Overview).unwrap();
        assert_eq!(overview.rows.len(), MarketIndicator::iter().count());

        let foreign = overview
            .rows
            .iter()
            .find(|r| r[1].value == Value::Text("外資現貨".to_string()))
            .unwrap();
        assert_eq!(foreign[2].value, Value::Number(120.0));
        assert_eq!(foreign[5].value, Value::Text("安全".to_string()));
        assert_eq!(foreign[5].tone, Some(Tone::Green));
        // 最後 5 日 80, 90, 100, 110, 120
        assert_eq!(foreign[6].value, Value::Number(100.0));
        assert_eq!(foreign[7].value, Value::Number(500.0));

        let vix = overview
            .rows
            .iter()
            .find(|r| r[1].value == Value::Text("恐慌指數 (VIX)".to_string()))
            .unwrap();
        assert_eq!(vix[5].value, Value::Text("危險".to_string()));
        assert_eq!(vix[4].value, Value::Number(-3.5));
        assert_eq!(vix[6].value, Value::Empty);

        let gold = overview
            .rows
            .iter()
            .find(|r| r[1].value == Value::Text("黃金指數 (GC=F)".to_string()))
            .unwrap();
        assert_eq!(gold[2].value, Value::Empty);
        assert_eq!(gold[5].value, Value::Text("無資料".to_string()));

        let futures = overview
            .rows
            .iter()
            .find(|r| r[1].value == Value::Text("外資期貨未平倉".to_string()))
            .unwrap();
        assert_eq!(futures[2].value, Value::Number(-30321.0));
        assert_eq!(futures[6].value, Value::Empty);
    }

    #[test]
    fn test_detail_rows() {
        let report = sample_report();
        let detail = report.section(SectionKind::Detail).unwrap();
        assert_eq!(detail.rows.len(), 7);

        let pc = &detail.rows[4];
        assert_eq!(pc[1].value, Value::Text("P/C Ratio".to_string()));
        assert_eq!(pc[3].value, Value::Number(120.0));
        assert_eq!(pc[4].value, Value::Empty);
        assert_eq!(pc[7].value, Value::Number(5.0));

        let volume = &detail.rows[6];
        assert_eq!(volume[7].value, Value::Number(0.0));
        assert_eq!(volume[3].value, Value::Empty);
    }

    #[test]
    fn test_chips_tones() {
        let report = sample_report();
        let chips = report.section(SectionKind::Chips).unwrap();
        let last = chips.rows.iter().rev().nth(4).unwrap();

        // 收盤價每日上漲
        assert_eq!(last[4].tone, Some(Tone::Red));
        assert_eq!(last[6].value, Value::Empty);
        assert_eq!(last[6].tone, None);
        assert_eq!(last[22].value, Value::Text("partial".to_string()));
        assert_eq!(last[26].value, Value::Bool(false));
    }
}
