use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;

use crate::report::{Report, Section, Value};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// `report.xlsx` 的總覽區段 => `report_overview.csv`
pub fn section_path(xlsx_path: &Path, section: &Section) -> PathBuf {
    let stem = xlsx_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".to_string());

    xlsx_path.with_file_name(format!("{}_{}.csv", stem, section.kind))
}

fn field(value: &Value) -> String {
    match value {
        Value::Empty => String::new(),
        Value::Text(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
    }
}

fn write_section(section: &Section, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    // 加上 BOM，Excel 才會以 UTF-8 開啟中文欄位
    file.write_all(UTF8_BOM)?;

    let mut writer = ::csv::Writer::from_writer(file);
    writer.write_record(&section.headers)?;

    for row in &section.rows {
        let mut record: Vec<String> = row.iter().map(|c| field(&c.value)).collect();
        record.resize(section.headers.len(), String::new());
        writer.write_record(&record)?;
    }

    writer.flush()?;

    Ok(())
}

/// 每個區段寫成一個 csv，回傳寫入的檔案路徑
pub fn write(report: &Report, xlsx_path: &Path) -> Result<Vec<PathBuf>> {
    report
        .sections
        .iter()
        .map(|section| {
            let path = section_path(xlsx_path, section);
            write_section(section, &path)?;
            Ok(path)
        })
        .collect()
}
