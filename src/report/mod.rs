//! 報表：同一份記憶體中的 [`Report`] 輸出成 xlsx、csv 與 json。
//!
//! 每個 [`Section`] 對應 xlsx 的一張工作表，第 1 列為合併的標題、第 3 列為欄位名稱、
//! 第 4 列開始為資料。

use chrono::NaiveDate;
use serde_json::{Map, Number};
use strum::{AsRefStr, Display};

/// 組合總覽、詳細數據與個股籌碼
pub mod assembler;
/// 每個區段一個 csv 檔
pub mod csv;
/// xlsx 轉 json
pub mod json;
/// 多工作表的 xlsx
pub mod xlsx;

/// 欄位名稱所在的列（從 0 起算）
pub const HEADER_ROW: u32 = 2;
/// 第一筆資料所在的列
pub const FIRST_DATA_ROW: u32 = HEADER_ROW + 1;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Value {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Empty => serde_json::Value::Null,
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Number(n) => Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::Bool(*b),
        }
    }
}

/// 儲存格字色
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display)]
pub enum Tone {
    Red,
    Green,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: Value,
    pub tone: Option<Tone>,
}

impl Cell {
    pub fn empty() -> Self {
        Cell {
            value: Value::Empty,
            tone: None,
        }
    }

    /// 空字串視為空白儲存格，xlsx 不會保留空字串
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            return Cell::empty();
        }

        Cell {
            value: Value::Text(s),
            tone: None,
        }
    }

    pub fn number(n: f64) -> Self {
        if !n.is_finite() {
            return Cell::empty();
        }

        Cell {
            value: Value::Number(n),
            tone: None,
        }
    }

    pub fn bool(b: bool) -> Self {
        Cell {
            value: Value::Bool(b),
            tone: None,
        }
    }

    /// None 為空白儲存格
    pub fn optional(n: Option<f64>) -> Self {
        n.map(Cell::number).unwrap_or_else(Cell::empty)
    }

    pub fn optional_int(n: Option<i64>) -> Self {
        Cell::optional(n.map(|v| v as f64))
    }

    pub fn with_tone(mut self, tone: Option<Tone>) -> Self {
        self.tone = tone;
        self
    }
}

/// 區段種類，名稱同時用於 csv 檔名
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum SectionKind {
    Overview,
    Detail,
    Chips,
}

impl SectionKind {
    /// 工作表名稱
    pub fn sheet_name(&self) -> &'static str {
        match self {
            SectionKind::Overview => "總覽",
            SectionKind::Detail => "詳細數據",
            SectionKind::Chips => "個股籌碼",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    pub name: String,
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Section {
    pub fn new(kind: SectionKind, title: String, headers: &[&str]) -> Self {
        Section {
            kind,
            name: kind.sheet_name().to_string(),
            title,
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: vec![],
        }
    }

    /// `{欄位名稱: 值}` 的陣列
    pub fn to_json(&self) -> serde_json::Value {
        let records = self
            .rows
            .iter()
            .map(|row| {
                let mut record = Map::with_capacity(self.headers.len());
                for (i, header) in self.headers.iter().enumerate() {
                    let value = row.get(i).map(|c| c.value.to_json());
                    record.insert(header.clone(), value.unwrap_or(serde_json::Value::Null));
                }
                serde_json::Value::Object(record)
            })
            .collect();

        serde_json::Value::Array(records)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub date: NaiveDate,
    pub sections: Vec<Section>,
}

impl Report {
    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// `{工作表名稱: [{欄位名稱: 值}]}`，與 excel_to_json 的輸出相同格式
    pub fn to_json(&self) -> serde_json::Value {
        let mut sheets = Map::with_capacity(self.sections.len());
        for section in &self.sections {
            sheets.insert(section.name.clone(), section.to_json());
        }

        serde_json::Value::Object(sheets)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_section_to_json() {
        let mut section = Section::new(
            SectionKind::Chips,
            "t".to_string(),
            &["代號", "收盤價", "模擬", "乖離"],
        );
        section.rows.push(vec![
            Cell::text("2330"),
            Cell::number(1710.0),
            Cell::bool(true),
            Cell::optional(None),
        ]);
        section.rows.push(vec![Cell::text("2317")]);

        let report = Report {
            date: NaiveDate::from_ymd_opt(2026, 1, 23).unwrap(),
            sections: vec![section],
        };

        assert_eq!(
            report.to_json(),
            json!({"個股籌碼": [
                {"代號": "2330", "收盤價": 1710.0, "模擬": true, "乖離": null},
                {"代號": "2317", "收盤價": null, "模擬": null, "乖離": null}
            ]})
        );
    }

    #[test]
    fn test_cell_number_rejects_nan() {
        assert_eq!(Cell::number(f64::NAN), Cell::empty());
        assert_eq!(Cell::optional_int(Some(3)).value, Value::Number(3.0));
        assert_eq!(Cell::text(""), Cell::empty());
        assert_eq!(SectionKind::Detail.to_string(), "detail");
        assert_eq!(SectionKind::Chips.sheet_name(), "個股籌碼");
    }
}
