use std::path::Path;

use anyhow::Result;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::report::{Cell, Report, Section, Tone, Value, FIRST_DATA_ROW, HEADER_ROW};

const HEADER_FILL: u32 = 0x4472C4;
const RED: u32 = 0xFF0000;
const GREEN: u32 = 0x008000;

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Red => Color::RGB(RED),
        Tone::Green => Color::RGB(GREEN),
    }
}

/// 欄寬依欄位名稱長度估算，中文字以兩個字元計
fn column_width(header: &str) -> f64 {
    let width: usize = header
        .chars()
        .map(|c| if c.is_ascii() { 1 } else { 2 })
        .sum();

    (width as f64 + 2.0).max(10.0)
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<()> {
    let format = cell
        .tone
        .map(|tone| Format::new().set_font_color(tone_color(tone)));

    match (&cell.value, format) {
        (Value::Empty, _) => {}
        (Value::Text(s), None) => {
            sheet.write_string(row, col, s)?;
        }
        (Value::Text(s), Some(f)) => {
            sheet.write_string_with_format(row, col, s, &f)?;
        }
        (Value::Number(n), None) => {
            sheet.write_number(row, col, *n)?;
        }
        (Value::Number(n), Some(f)) => {
            sheet.write_number_with_format(row, col, *n, &f)?;
        }
        (Value::Bool(b), None) => {
            sheet.write_boolean(row, col, *b)?;
        }
        (Value::Bool(b), Some(f)) => {
            sheet.write_boolean_with_format(row, col, *b, &f)?;
        }
    }

    Ok(())
}

fn write_section(workbook: &mut Workbook, section: &Section) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(&section.name)?;

    let title_format = Format::new()
        .set_bold()
        .set_font_size(16)
        .set_align(FormatAlign::Center);
    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_border(FormatBorder::Thin);

    let last_col = section.headers.len().saturating_sub(1) as u16;
    if last_col > 0 {
        sheet.merge_range(0, 0, 0, last_col, &section.title, &title_format)?;
    } else {
        sheet.write_string_with_format(0, 0, &section.title, &title_format)?;
    }

    for (col, header) in section.headers.iter().enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(HEADER_ROW, col, header, &header_format)?;
        sheet.set_column_width(col, column_width(header))?;
    }

    for (i, row) in section.rows.iter().enumerate() {
        let row_index = FIRST_DATA_ROW + i as u32;
        for (col, cell) in row.iter().enumerate() {
            write_cell(sheet, row_index, col as u16, cell)?;
        }
    }

    Ok(())
}

/// 每個區段一張工作表，依報表中的順序
pub fn write(report: &Report, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();

    for section in &report.sections {
        write_section(&mut workbook, section)?;
    }

    workbook.save(path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use calamine::{open_workbook, Data, Reader, Xlsx};

    use super::*;
    use crate::report::assembler::tests::sample_report;

    #[test]
    fn test_write_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let report = sample_report();

        write(&report, &path).unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["總覽", "詳細數據", "個股籌碼"]);

        let range = workbook.worksheet_range("個股籌碼").unwrap();
        assert_eq!(
            range.get_value((0, 0)),
            Some(&Data::String("個股籌碼監控 - 2026-01-22".to_string()))
        );
        assert_eq!(
            range.get_value((HEADER_ROW, 1)),
            Some(&Data::String("股票代號".to_string()))
        );
        assert_eq!(
            range.get_value((FIRST_DATA_ROW, 1)),
            Some(&Data::String("2330".to_string()))
        );
        assert_eq!(range.get_value((FIRST_DATA_ROW, 26)), Some(&Data::Bool(false)));
    }

    #[test]
    fn test_column_width() {
        assert_eq!(column_width("收盤價"), 10.0);
        assert_eq!(column_width("籌碼集中度5D(%)"), 17.0);
    }
}
