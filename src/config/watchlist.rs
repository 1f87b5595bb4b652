use std::{fs, path::Path};

use anyhow::{anyhow, Context, Result};
use hashbrown::HashSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 台股代號：4~6 碼英數字，例如 2330、00878、006208
static STOCK_CODE: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[0-9A-Z]{4,6}$"));

/// 觀察清單中的一檔股票
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WatchlistEntry {
    pub code: String,
    pub name: String,
}

#[derive(Deserialize, Debug)]
struct WatchlistFile {
    watchlist: Vec<RawEntry>,
}

#[derive(Deserialize, Debug)]
struct RawEntry {
    code: Option<serde_json::Value>,
    name: Option<String>,
}

/// 讀取並驗證觀察清單，任一筆不合法就整份拒絕
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<WatchlistEntry>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read watchlist {}", path.display()))?;

    parse(&text).with_context(|| format!("Invalid watchlist {}", path.display()))
}

/// 解析 `{"watchlist":[{"code":"2330","name":"台積電"}]}` 格式的內容
pub fn parse(text: &str) -> Result<Vec<WatchlistEntry>> {
    let file: WatchlistFile =
        serde_json::from_str(text).map_err(|why| anyhow!("malformed JSON: {}", why))?;

    if file.watchlist.is_empty() {
        return Err(anyhow!("the watchlist is empty"));
    }

    let pattern = STOCK_CODE
        .as_ref()
        .map_err(|why| anyhow!("Failed to compile stock code pattern: {:?}", why))?;
    let mut seen = HashSet::with_capacity(file.watchlist.len());
    let mut entries = Vec::with_capacity(file.watchlist.len());

    for (i, raw) in file.watchlist.into_iter().enumerate() {
        let position = i + 1;
        // 代號寫成數字 2330 也接受，但 0050 這類開頭為 0 的必須是字串
        let code = match raw.code {
            Some(serde_json::Value::String(s)) => s.trim().to_uppercase(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(other) => {
                return Err(anyhow!(
                    "entry #{} has a code of unexpected type: {}",
                    position,
                    other
                ))
            }
            None => return Err(anyhow!("entry #{} is missing \"code\"", position)),
        };

        if !pattern.is_match(&code) {
            return Err(anyhow!(
                "entry #{} has an invalid stock code '{}'",
                position,
                code
            ));
        }

        let name = raw.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            return Err(anyhow!("entry #{} ({}) is missing a name", position, code));
        }

        if !seen.insert(code.clone()) {
            return Err(anyhow!("entry #{} duplicates stock code {}", position, code));
        }

        entries.push(WatchlistEntry { code, name });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_keeps_declared_order() {
        let list = parse(
            r#"{"watchlist":[
                {"code":"2330","name":"台積電"},
                {"code":" 0050 ","name":"元大台灣50"},
                {"code":2317,"name":"鴻海"}
            ]}"#,
        )
        .unwrap();

        let codes: Vec<&str> = list.iter().map(|e| e.code.as_str()).collect();
        assert_eq!(codes, vec!["2330", "0050", "2317"]);
        assert_eq!(list[1].name, "元大台灣50");
    }

    #[test]
    fn test_parse_rejects_malformed_entries() {
        let cases = [
            (r#"{"watchlist":[]}"#, "empty"),
            (r#"{"watchlist":[{"name":"台積電"}]}"#, "missing \"code\""),
            (r#"{"watchlist":[{"code":"23","name":"x"}]}"#, "invalid stock code"),
            (r#"{"watchlist":[{"code":"2330","name":"  "}]}"#, "missing a name"),
            (
                r#"{"watchlist":[{"code":"2330","name":"a"},{"code":"2330","name":"b"}]}"#,
                "duplicates",
            ),
            (r#"{"watchlist":[{"code":true,"name":"a"}]}"#, "unexpected type"),
            (r#"{"stocks":[]}"#, "malformed JSON"),
        ];

        for (text, expected) in cases {
            let err = parse(text).unwrap_err().to_string();
            assert!(err.contains(expected), "{} => {}", text, err);
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"watchlist":[{{"code":"2454","name":"聯發科"}}]}}"#).unwrap();

        let list = load(file.path()).unwrap();
        assert_eq!(
            list,
            vec![WatchlistEntry {
                code: "2454".to_string(),
                name: "聯發科".to_string()
            }]
        );

        let missing = load("does-not-exist.json").unwrap_err();
        assert!(missing.to_string().contains("Failed to read watchlist"));
    }
}
