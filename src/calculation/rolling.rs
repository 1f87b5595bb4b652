/// 四捨五入到小數第 `dp` 位
pub fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}

pub fn round2(value: f64) -> f64 {
    round_dp(value, 2)
}

/// 最後 `n` 筆
fn last_n(values: &[f64], n: usize) -> Option<&[f64]> {
    if n == 0 || values.len() < n {
        return None;
    }

    Some(&values[values.len() - n..])
}

/// 最後 `n` 筆的平均，不足 `n` 筆回傳 None
pub fn avg(values: &[f64], n: usize) -> Option<f64> {
    last_n(values, n).map(|w| round2(w.iter().sum::<f64>() / n as f64))
}

/// 平均值取整數，期貨口數使用
pub fn avg_int(values: &[f64], n: usize) -> Option<f64> {
    last_n(values, n).map(|w| (w.iter().sum::<f64>() / n as f64).round())
}

/// 最後 `n` 筆的總和，不足 `n` 筆回傳 None
pub fn sum(values: &[f64], n: usize) -> Option<f64> {
    last_n(values, n).map(|w| round2(w.iter().sum()))
}

/// 5 日與 20 日的平均與總和
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowStats {
    pub avg_5d: Option<f64>,
    pub sum_5d: Option<f64>,
    pub avg_20d: Option<f64>,
    pub sum_20d: Option<f64>,
    pub samples: usize,
}

impl WindowStats {
    pub fn of(values: &[f64]) -> Self {
        WindowStats {
            avg_5d: avg(values, 5),
            sum_5d: sum(values, 5),
            avg_20d: avg(values, 20),
            sum_20d: sum(values, 20),
            samples: values.len(),
        }
    }

    /// 只需要 5 日平均的指標（P/C ratio）
    pub fn avg_5d_only(values: &[f64]) -> Self {
        WindowStats {
            avg_5d: avg(values, 5),
            samples: values.len(),
            ..Default::default()
        }
    }

    /// 5 日平均取整數（期貨未平倉口數）
    pub fn avg_5d_int(values: &[f64]) -> Self {
        WindowStats {
            avg_5d: avg_int(values, 5),
            samples: values.len(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_below_window() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(avg(&values, 5), None);
        assert_eq!(sum(&values, 5), None);
        assert_eq!(avg(&values, 0), None);
    }

    #[test]
    fn test_uses_last_values() {
        let values = [100.0, 1.0, 2.0, 3.0, 4.0, 5.5];
        assert_eq!(avg(&values, 5), Some(3.1));
        assert_eq!(sum(&values, 5), Some(15.5));
        let futures = [-30321.0, -29000.0, -31000.0, -30500.0, -30001.0];
        assert_eq!(avg_int(&futures, 5), Some(-30164.0));
    }

    #[test]
    fn test_window_stats() {
        let values: Vec<f64> = (1..=25).map(|v| v as f64).collect();
        let stats = WindowStats::of(&values);
        assert_eq!(stats.avg_5d, Some(23.0));
        assert_eq!(stats.sum_5d, Some(115.0));
        assert_eq!(stats.avg_20d, Some(15.5));
        assert_eq!(stats.sum_20d, Some(310.0));
        assert_eq!(stats.samples, 25);

        let short = WindowStats::of(&values[..7]);
        assert_eq!(short.avg_20d, None);
        assert_eq!(short.sum_5d, Some(25.0));
    }

    #[test]
    fn test_round() {
        assert_eq!(round2(109.456), 109.46);
        assert_eq!(round_dp(-0.125, 1), -0.1);
    }
}
