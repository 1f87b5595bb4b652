use anyhow::Result;
use chrono::NaiveDate;
use scraper::Html;

use crate::{
    crawler::taifex::{self, HOST},
    util::{self, http::element, text},
};

/// 臺股期貨 (TX)
const TAIEX_FUTURES: &str = "臺股期貨";

/// 抓取外資在臺股期貨的未平倉淨口數，休市日回傳 None
pub async fn visit(date: NaiveDate) -> Result<Option<i64>> {
    let url = format!(
        "https://{}/cht/3/futContractsDate?queryType=1&doQuery=1&queryDate={}&commodityId=",
        HOST,
        urlencoding::encode(&taifex::query_date(date))
    );

    let html = util::http::get(&url, None).await?;
    parse(&html)
}

/// 表格每個商品有自營商、投信、外資三列，商品名稱以 rowspan 只出現在第一列；
/// 每列最後六個數字為未平倉的多方口數、多方金額、空方口數、空方金額、淨口數、淨金額
fn parse(html: &str) -> Result<Option<i64>> {
    let document = Html::parse_document(html);
    let tr = element::selector("tr")?;
    let td = element::selector("th, td")?;
    let mut commodity = String::new();

    for row in document.select(&tr) {
        let cells = element::cell_texts(&row, &td);
        if let Some(name) = cells
            .iter()
            .find(|c| c.ends_with("期貨") || c.ends_with("選擇權"))
        {
            commodity = name.clone();
        }

        if commodity != TAIEX_FUTURES || !cells.iter().any(|c| c.starts_with("外資")) {
            continue;
        }

        let numbers: Vec<i64> = cells
            .iter()
            .filter_map(|c| text::parse_i64(c, None).ok())
            .collect();
        if numbers.len() >= 2 {
            return Ok(Some(numbers[numbers.len() - 2]));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;

    const PAGE: &str = r#"
        <table class="table_f">
          <tr><th>序號</th><th>商品名稱</th><th>身份別</th><th colspan="6">交易口數與契約金額</th><th colspan="6">未平倉餘額</th></tr>
          <tr><td rowspan="3">1</td><td rowspan="3">臺股期貨</td><td>自營商</td>
              <td>10,000</td><td>60,000,000</td><td>9,000</td><td>55,000,000</td><td>1,000</td><td>5,000,000</td>
              <td>8,000</td><td>48,000,000</td><td>9,500</td><td>57,000,000</td><td>-1,500</td><td>-9,000,000</td></tr>
          <tr><td>投信</td>
              <td>500</td><td>3,000,000</td><td>100</td><td>600,000</td><td>400</td><td>2,400,000</td>
              <td>20,000</td><td>120,000,000</td><td>3,000</td><td>18,000,000</td><td>17,000</td><td>102,000,000</td></tr>
          <tr><td>外資</td>
              <td>50,000</td><td>300,000,000</td><td>52,000</td><td>312,000,000</td><td>-2,000</td><td>-12,000,000</td>
              <td>15,000</td><td>90,000,000</td><td>45,321</td><td>272,000,000</td><td>-30,321</td><td>-182,000,000</td></tr>
          <tr><td rowspan="3">2</td><td rowspan="3">電子期貨</td><td>自營商</td><td>1</td><td>1</td></tr>
          <tr><td>外資</td><td>1</td><td>2</td><td>3</td><td>4</td><td>999</td><td>5</td></tr>
        </table>"#;

    #[test]
    fn test_parse() {
        assert_eq!(parse(PAGE).unwrap(), Some(-30321));
    }

    #[test]
    fn test_parse_holiday() {
        assert_eq!(parse("<html><body>查無資料</body></html>").unwrap(), None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_visit() {
        dotenv::dotenv().ok();
        let _ = rustls::crypto::ring::default_provider().install_default();
        logging::debug_file_async("開始 visit".to_string());

        let date = NaiveDate::from_ymd_opt(2026, 1, 23).unwrap();
        match visit(date).await {
            Ok(net) => logging::debug_file_async(format!("net:{:?}", net)),
            Err(why) => logging::debug_file_async(format!("Failed to visit because {:?}", why)),
        }

        logging::debug_file_async("結束 visit".to_string());
        logging::flush().await;
    }
}
