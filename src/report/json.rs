//! xlsx 轉 json：`{工作表名稱: [{欄位名稱: 值}]}`
//!
//! 每張工作表都以第 3 列為欄位名稱，完全空白的列與欄會被略過。

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Map, Number, Value};

use crate::{logging, report::HEADER_ROW};

fn to_json(data: &Data) -> Value {
    match data {
        Data::Empty => Value::Null,
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::String(s.clone()),
        Data::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Data::Int(i) => Value::Number((*i).into()),
        Data::Bool(b) => Value::Bool(*b),
        other => Value::String(other.to_string()),
    }
}

/// 單一工作表轉成物件陣列
fn sheet_to_json(range: &Range<Data>) -> Vec<Value> {
    let (end_row, end_col) = match range.end() {
        Some(end) => end,
        None => return vec![],
    };
    if end_row < HEADER_ROW {
        return vec![];
    }

    let cell = |row: u32, col: u32| -> Value {
        range.get_value((row, col)).map(to_json).unwrap_or(Value::Null)
    };

    let rows: Vec<Vec<Value>> = (HEADER_ROW + 1..=end_row)
        .map(|row| (0..=end_col).map(|col| cell(row, col)).collect::<Vec<_>>())
        .filter(|values| values.iter().any(|v| !v.is_null()))
        .collect();

    let columns: Vec<(usize, String)> = (0..=end_col)
        .filter_map(|col| {
            let header = cell(HEADER_ROW, col);
            let has_data = rows.iter().any(|r| !r[col as usize].is_null());
            match header {
                Value::String(name) => Some((col as usize, name)),
                Value::Null if has_data => Some((col as usize, format!("column_{}", col + 1))),
                Value::Null => None,
                other => Some((col as usize, other.to_string())),
            }
        })
        .collect();

    rows.into_iter()
        .map(|values| {
            let mut record = Map::with_capacity(columns.len());
            for (col, name) in &columns {
                record.insert(name.clone(), values[*col].clone());
            }
            Value::Object(record)
        })
        .collect()
}

/// 讀取整本活頁簿，工作表依檔案中的順序
pub fn workbook_to_json(path: &Path) -> Result<Value> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|why| anyhow!("Failed to open {} because {:?}", path.display(), why))?;

    let mut sheets = Map::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|why| anyhow!("Failed to read sheet {} because {:?}", name, why))?;
        sheets.insert(name, Value::Array(sheet_to_json(&range)));
    }

    Ok(Value::Object(sheets))
}

/// 以 `indent` 個空白縮排輸出，中文不跳脫
pub fn to_pretty_string(value: &Value, indent: usize) -> Result<String> {
    let indent = " ".repeat(indent);
    let formatter = PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;

    Ok(String::from_utf8(buf)?)
}

/// `monitor_xlsx/risk_report_20260122.xlsx` => `json/risk_report_20260122.json`
pub fn json_path(input: &Path, json_dir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| anyhow!("{} has no file name", input.display()))?;

    Ok(json_dir.join(format!("{}.json", stem.to_string_lossy())))
}

/// 轉換單一檔案
pub fn convert_file(input: &Path, output: &Path, indent: usize) -> Result<()> {
    if !input.is_file() {
        return Err(anyhow!("{} does not exist", input.display()));
    }

    let value = workbook_to_json(input)?;
    let text = to_pretty_string(&value, indent)?;

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut file = fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    file.write_all(text.as_bytes())?;

    logging::info_file_async(format!(
        "{} converted to {}",
        input.display(),
        output.display()
    ));

    Ok(())
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// json 存在且修改時間不早於 xlsx 時不需要重新轉換
fn is_up_to_date(input: &Path, output: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();

    match (modified(input), modified(output)) {
        (Some(xlsx), Some(json)) => xlsx <= json,
        _ => false,
    }
}

/// 轉換資料夾內所有 xlsx，依檔名排序
pub fn convert_dir(
    input_dir: &Path,
    json_dir: &Path,
    indent: usize,
    force: bool,
) -> Result<BatchSummary> {
    if !input_dir.is_dir() {
        return Err(anyhow!("{} is not a directory", input_dir.display()));
    }

    let mut inputs: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "xlsx"))
        .collect();
    inputs.sort();

    let mut summary = BatchSummary::default();
    for input in &inputs {
        let output = json_path(input, json_dir)?;

        if !force && is_up_to_date(input, &output) {
            logging::info_console(format!("[SKIP] {}", input.display()));
            summary.skipped += 1;
            continue;
        }

        match convert_file(input, &output, indent) {
            Ok(()) => {
                logging::info_console(format!("{} => {}", input.display(), output.display()));
                summary.converted += 1;
            }
            Err(why) => {
                logging::error_console(format!("Failed to convert {} because {:?}", input.display(), why));
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{assembler::tests::sample_report, xlsx};

    /// 數值允許浮點誤差，其餘需完全相同
    fn assert_json_eq(actual: &Value, expected: &Value) {
        match (actual, expected) {
            (Value::Number(a), Value::Number(b)) => {
                let (a, b) = (a.as_f64().unwrap(), b.as_f64().unwrap());
                assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
            }
            (Value::Array(a), Value::Array(b)) => {
                assert_eq!(a.len(), b.len());
                a.iter().zip(b).for_each(|(a, b)| assert_json_eq(a, b));
            }
            (Value::Object(a), Value::Object(b)) => {
                assert_eq!(a.keys().collect::<Vec<_>>(), b.keys().collect::<Vec<_>>());
                for (key, value) in a {
                    assert_json_eq(value, &b[key]);
                }
            }
            _ => assert_eq!(actual, expected),
        }
    }

    #[test]
    fn test_workbook_matches_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let report = sample_report();
        xlsx::write(&report, &path).unwrap();

        let converted = workbook_to_json(&path).unwrap();
        let sheets: Vec<&String> = converted.as_object().unwrap().keys().collect();
        assert_eq!(sheets, vec!["總覽", "詳細數據", "個股籌碼"]);

        let expected = report.to_json();
        for name in ["總覽", "詳細數據", "個股籌碼"] {
            assert_json_eq(&converted[name], &expected[name]);
        }
    }

    #[test]
    fn test_blank_header_and_empty_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("總覽").unwrap();
        sheet.write_string(0, 0, "標題").unwrap();
        sheet.write_string(2, 0, "指標").unwrap();
        sheet.write_string(3, 0, "VIX").unwrap();
        sheet.write_number(3, 2, 18.5).unwrap();
        sheet.write_string(5, 0, "SOX").unwrap();
        workbook.save(&path).unwrap();

        let converted = workbook_to_json(&path).unwrap();
        assert_eq!(
            converted,
            serde_json::json!({"總覽": [
                {"指標": "VIX", "column_3": 18.5},
                {"指標": "SOX", "column_3": null}
            ]})
        );
    }

    #[test]
    fn test_convert_dir_skips_up_to_date() {
        let dir = tempfile::tempdir().unwrap();
        let input_dir = dir.path().join("monitor_xlsx");
        let json_dir = dir.path().join("json");
        fs::create_dir_all(&input_dir).unwrap();
        xlsx::write(&sample_report(), &input_dir.join("risk_report_20260122.xlsx")).unwrap();
        fs::write(input_dir.join("notes.txt"), "x").unwrap();

        let first = convert_dir(&input_dir, &json_dir, 2, false).unwrap();
        assert_eq!(first.converted, 1);
        assert!(json_dir.join("risk_report_20260122.json").is_file());

        let second = convert_dir(&input_dir, &json_dir, 2, false).unwrap();
        assert_eq!(second.skipped, 1);
        assert_eq!(second.converted, 0);

        let forced = convert_dir(&input_dir, &json_dir, 2, true).unwrap();
        assert_eq!(forced.converted, 1);
    }

    #[test]
    fn test_pretty_indent() {
        let value = serde_json::json!({"總覽": [1]});
        assert_eq!(
            to_pretty_string(&value, 4).unwrap(),
            "{\n    \"總覽\": [\n        1\n    ]\n}"
        );
        assert!(convert_file(Path::new("missing.xlsx"), Path::new("x.json"), 2).is_err());
    }
}
