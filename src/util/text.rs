use std::str::FromStr;

use anyhow::{anyhow, Result};
use encoding_rs::BIG5;
use hashbrown::HashSet;
use rust_decimal::Decimal;

/// 交易所數字欄位常見的千分位、單位與 html 殘留字元
const NUMBER_ESCAPE_CHAR: &[char] = &['元', '%', ',', ' ', '"', '\n', '\r', '\t', '+'];

/// 表示「無資料」的佔位字串
const EMPTY_MARKERS: &[&str] = &["", "--", "-", "---", "N/A", "X", "除權息"];

/// Converts a Big5 encoded byte slice to a UTF-8 `String`.
///
/// TAIFEX 下載的 csv 為 Big5 編碼；無法解碼的位元組以替代字元取代而不中斷
pub fn big5_2_utf8(data: &[u8]) -> Result<String> {
    let (text, _, had_errors) = BIG5.decode(data);
    if had_errors && text.trim().is_empty() {
        return Err(anyhow!("Failed to decode {} bytes as BIG5", data.len()));
    }

    Ok(text.into_owned())
}

/// 判斷欄位是否為無資料的佔位字串
pub fn is_empty_marker(s: &str) -> bool {
    let trimmed = s.trim();
    EMPTY_MARKERS.iter().any(|m| *m == trimmed)
}

/// Parses a decimal value from a given string.
///
/// 先移除千分位與 `escape_chars` 再轉換，例如 `"1,234.56"` => `1234.56`
pub fn parse_decimal(s: &str, escape_chars: Option<Vec<char>>) -> Result<Decimal> {
    let cleaned = clean_escape_chars(s, escape_chars);
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|why| anyhow!("Failed to parse '{}' as Decimal because {:?}", cleaned, why))
}

/// Parses an `f64` value from a given string.
pub fn parse_f64(s: &str, escape_chars: Option<Vec<char>>) -> Result<f64> {
    let cleaned = clean_escape_chars(s, escape_chars);
    f64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as f64 because: {:?}", cleaned, why))
}

/// Parses an `i64` value from a given string.
///
/// `"-1,234"` => `-1234`
pub fn parse_i64(s: &str, escape_chars: Option<Vec<char>>) -> Result<i64> {
    let cleaned = clean_escape_chars(s, escape_chars);
    i64::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as i64 because: {:?}", cleaned, why))
}

/// 解析數字欄位，佔位字串或無法解析時回傳 None
pub fn parse_optional_f64(s: &str) -> Option<f64> {
    if is_empty_marker(s) {
        return None;
    }

    parse_f64(s, None).ok().filter(|v| v.is_finite())
}

/// Removes a set of escape characters from a given string.
pub(crate) fn clean_escape_chars(s: &str, escape_chars: Option<Vec<char>>) -> String {
    let mut combined: Vec<char> = NUMBER_ESCAPE_CHAR.to_vec();
    if let Some(ec) = escape_chars {
        combined.extend(ec);
    }

    let filters = combined.iter().collect::<HashSet<_>>();
    s.chars().filter(|c| !filters.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    // 注意這個慣用法：在 tests 模組中，從外部範疇匯入所有名字。
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_big5_2_utf8() {
        let (bytes, _, _) = BIG5.encode("日期,買賣權未平倉量比率%");
        let utf8 = big5_2_utf8(&bytes).unwrap();
        assert_eq!(utf8, "日期,買賣權未平倉量比率%");
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_decimal("1,234.56", None).unwrap(), dec!(1234.56));
        assert_eq!(parse_decimal("-12,345,678,901", None).unwrap(), dec!(-12345678901));
        assert_eq!(parse_i64(" -1,234 ", None).unwrap(), -1234);
        assert_eq!(parse_f64("+3.25%", None).unwrap(), 3.25);
        assert_eq!(parse_f64("(5.5)", Some(vec!['(', ')'])).unwrap(), 5.5);
        assert!(parse_i64("abc", None).is_err());
    }

    #[test]
    fn test_parse_optional_f64() {
        assert_eq!(parse_optional_f64("--"), None);
        assert_eq!(parse_optional_f64(" "), None);
        assert_eq!(parse_optional_f64("N/A"), None);
        assert_eq!(parse_optional_f64("1,000"), Some(1000.0));
    }

    #[test]
    fn test_clean_escape_chars() {
        let result = clean_escape_chars("台積電% 元 ,", Some(vec!['台']));
        assert_eq!(result, "積電");
    }
}
