use anyhow::{anyhow, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// A trait representing the weekend concept.
pub trait Weekend {
    /// Returns `true` if the date is on a Saturday or Sunday.
    fn is_weekend(&self) -> bool;
}

impl Weekend for NaiveDate {
    fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

/// 解析 `YYYYMMDD`
pub fn parse_yyyymmdd(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if s.len() != 8 || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(anyhow!("'{}' is not a YYYYMMDD date", s));
    }

    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|why| anyhow!("'{}' is not a valid date: {}", s, why))
}

/// 週末回退到前一個週五，其餘日期不變
pub fn trading_date(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date - Duration::days(2),
        _ => date,
    }
}

/// 由 `date`（含）往前取 `count` 個工作日，回傳時由舊到新排序
///
/// 只排除週末，國定假日由呼叫端從交易所的回應判斷
pub fn previous_weekdays(date: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut current = date;

    while days.len() < count {
        if !current.is_weekend() {
            days.push(current);
        }
        current -= Duration::days(1);
    }

    days.reverse();
    days
}

/// 當月第一天
pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// 前一個月的第一天
pub fn first_day_of_previous_month(date: NaiveDate) -> NaiveDate {
    first_day_of_month(first_day_of_month(date) - Duration::days(1))
}

/// Convert ROC year to Gregorian year.
pub fn to_gregorian_year(year: i32) -> i32 {
    year + 1911
}

/// Parse a date string in the format of ROC calendar (115/01/23)
/// and return it as a NaiveDate in the Gregorian calendar.
pub fn parse_taiwan_date(date_str: &str) -> Option<NaiveDate> {
    let (year, month, day) = split_date(date_str)?;
    NaiveDate::from_ymd_opt(to_gregorian_year(year), month, day)
}

/// 解析 `2026/1/23` 或 `2026-01-23` 這類西元日期，月、日可不補零
pub fn parse_slash_date(date_str: &str) -> Option<NaiveDate> {
    let (year, month, day) = split_date(date_str)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn split_date(date_str: &str) -> Option<(i32, u32, u32)> {
    let parts: Vec<&str> = date_str.trim().split(['/', '-']).collect();
    if parts.len() != 3 {
        return None;
    }

    Some((
        parts[0].trim().parse::<i32>().ok()?,
        parts[1].trim().parse::<u32>().ok()?,
        parts[2].trim().parse::<u32>().ok()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trading_date_rolls_weekend_back() {
        // 2026-01-24 是週六
        assert_eq!(trading_date(ymd(2026, 1, 24)), ymd(2026, 1, 23));
        assert_eq!(trading_date(ymd(2026, 1, 25)), ymd(2026, 1, 23));
        assert_eq!(trading_date(ymd(2026, 1, 23)), ymd(2026, 1, 23));
    }

    #[test]
    fn test_previous_weekdays() {
        let days = previous_weekdays(ymd(2026, 1, 26), 3);
        assert_eq!(days, vec![ymd(2026, 1, 22), ymd(2026, 1, 23), ymd(2026, 1, 26)]);
        assert!(days.iter().all(|d| !d.is_weekend()));
        assert_eq!(previous_weekdays(ymd(2026, 1, 26), 35).len(), 35);
    }

    #[test]
    fn test_parse_dates() {
        assert_eq!(parse_yyyymmdd("20260123").unwrap(), ymd(2026, 1, 23));
        assert!(parse_yyyymmdd("2026-01-23").is_err());
        assert!(parse_yyyymmdd("20261332").is_err());
        assert_eq!(parse_taiwan_date("115/01/23"), Some(ymd(2026, 1, 23)));
        assert_eq!(parse_slash_date("2026/1/5"), Some(ymd(2026, 1, 5)));
        assert_eq!(parse_slash_date("2026-01-05"), Some(ymd(2026, 1, 5)));
        assert_eq!(parse_slash_date("日期"), None);
    }

    #[test]
    fn test_month_boundaries() {
        assert_eq!(first_day_of_month(ymd(2026, 3, 17)), ymd(2026, 3, 1));
        assert_eq!(first_day_of_previous_month(ymd(2026, 1, 23)), ymd(2025, 12, 1));
    }
}
