use crate::declare::{ChipsRating, MarketIndicator, RiskLevel};

/// 大盤指標的風險燈號，門檻值小於即成立
pub fn assess_risk(indicator: MarketIndicator, value: Option<f64>) -> RiskLevel {
    let value = match value {
        Some(v) => v,
        None => return RiskLevel::NoData,
    };

    let rules: &[(f64, RiskLevel)] = match indicator {
        MarketIndicator::Vix => &[
            (20.0, RiskLevel::Safe),
            (30.0, RiskLevel::Caution),
            (f64::INFINITY, RiskLevel::Danger),
        ],
        MarketIndicator::ForeignNet => &[
            (0.0, RiskLevel::Danger),
            (100.0, RiskLevel::Caution),
            (f64::INFINITY, RiskLevel::Safe),
        ],
        MarketIndicator::TotalNet => &[
            (-200.0, RiskLevel::Danger),
            (0.0, RiskLevel::Caution),
            (f64::INFINITY, RiskLevel::Safe),
        ],
        _ => &[],
    };

    rules
        .iter()
        .find(|(threshold, _)| value < *threshold)
        .map(|(_, level)| *level)
        .unwrap_or(RiskLevel::Neutral)
}

/// 依外資、投信 5 日買賣超與融資 5 日增減評分
///
/// 外資 ±2、投信 ±1；融資減少代表籌碼沉澱 +1，增加 -1
pub fn rate_chips(
    foreign_5d: Option<f64>,
    trust_5d: Option<f64>,
    margin_5d: Option<f64>,
) -> ChipsRating {
    let sign = |v: Option<f64>| match v {
        Some(v) if v > 0.0 => 1,
        Some(v) if v < 0.0 => -1,
        _ => 0,
    };

    let score = 2 * sign(foreign_5d) + sign(trust_5d) - sign(margin_5d);

    match score {
        s if s >= 3 => ChipsRating::StrongBuy,
        s if s >= 1 => ChipsRating::Bullish,
        s if s <= -3 => ChipsRating::StrongSell,
        s if s <= -1 => ChipsRating::Bearish,
        _ => ChipsRating::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assess_risk() {
        assert_eq!(assess_risk(MarketIndicator::Vix, Some(19.99)), RiskLevel::Safe);
        assert_eq!(assess_risk(MarketIndicator::Vix, Some(20.0)), RiskLevel::Caution);
        assert_eq!(assess_risk(MarketIndicator::Vix, Some(35.0)), RiskLevel::Danger);
        assert_eq!(assess_risk(MarketIndicator::ForeignNet, Some(-0.5)), RiskLevel::Danger);
        assert_eq!(assess_risk(MarketIndicator::ForeignNet, Some(50.0)), RiskLevel::Caution);
        assert_eq!(assess_risk(MarketIndicator::ForeignNet, Some(100.0)), RiskLevel::Safe);
        assert_eq!(assess_risk(MarketIndicator::TotalNet, Some(-250.0)), RiskLevel::Danger);
        assert_eq!(assess_risk(MarketIndicator::TotalNet, Some(-10.0)), RiskLevel::Caution);
        assert_eq!(assess_risk(MarketIndicator::TotalNet, Some(0.0)), RiskLevel::Safe);
        assert_eq!(assess_risk(MarketIndicator::Gold, Some(2000.0)), RiskLevel::Neutral);
        assert_eq!(assess_risk(MarketIndicator::Vix, None), RiskLevel::NoData);
    }

    #[test]
    fn test_rate_chips() {
        assert_eq!(rate_chips(Some(1.0), Some(1.0), Some(-1.0)), ChipsRating::StrongBuy);
        assert_eq!(rate_chips(Some(1.0), Some(-1.0), Some(1.0)), ChipsRating::Neutral);
        assert_eq!(rate_chips(Some(1.0), None, None), ChipsRating::Bullish);
        assert_eq!(rate_chips(Some(-1.0), Some(-1.0), None), ChipsRating::StrongSell);
        assert_eq!(rate_chips(None, Some(-1.0), None), ChipsRating::Bearish);
        assert_eq!(rate_chips(Some(0.0), None, Some(0.0)), ChipsRating::Neutral);
    }
}
