use anyhow::{anyhow, Result};
use scraper::{ElementRef, Selector};

/// 建立 css selector，失敗時轉成 anyhow 錯誤
pub fn selector(css_selector: &str) -> Result<Selector> {
    Selector::parse(css_selector)
        .map_err(|why| anyhow!("Failed to Selector::parse({}) because: {:?}", css_selector, why))
}

/// 取得元素內所有文字並去除空白，`<td> 1,234 <br> </td>` => `"1,234"`
pub fn text_of(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join("")
}

/// 取得表格列中每個儲存格的文字
pub fn cell_texts(row: &ElementRef, cell_selector: &Selector) -> Vec<String> {
    row.select(cell_selector).map(|cell| text_of(&cell)).collect()
}
