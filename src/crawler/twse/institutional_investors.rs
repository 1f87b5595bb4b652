use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

use crate::{
    crawler::twse::{self, Response},
    fetcher::record::MarketFlow,
    util::text,
};

/// 抓取大盤三大法人買賣金額，回傳單位為億元，休市日回傳 None
pub async fn visit(date: NaiveDate) -> Result<Option<MarketFlow>> {
    let path = format!(
        "/fund/BFI82U?response=json&dayDate={}&type=day",
        date.format("%Y%m%d")
    );

    Ok(twse::fetch(&path).await?.map(|res| parse(date, &res)))
}

/// 單位名稱：
/// 自營商(自行買賣)、自營商(避險)、投信、外資及陸資(不含外資自營商)、外資自營商、合計
fn parse(date: NaiveDate, res: &Response) -> MarketFlow {
    let mut flow = MarketFlow {
        date,
        ..Default::default()
    };

    for row in &res.data {
        if row.len() < 4 {
            continue;
        }

        let name = twse::cell(row, 0);
        let net = match to_hundred_million(&twse::cell(row, 3)) {
            Some(net) => net,
            None => continue,
        };

        if name.contains("外資及陸資") && name.contains("不含") {
            flow.foreign_net = Some(net);
        } else if name == "投信" {
            flow.trust_net = Some(net);
        } else if name.starts_with("自營商") {
            flow.dealer_net = Some(flow.dealer_net.unwrap_or_default() + net);
        } else if name == "合計" {
            flow.total_net = Some(net);
        }
    }

    flow
}

/// 元 => 億元，四捨五入到小數第二位
fn to_hundred_million(amount: &str) -> Option<f64> {
    let amount = text::parse_decimal(amount, None).ok()?;
    (amount / dec!(100_000_000)).round_dp(2).to_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging;

    #[test]
    fn test_parse() {
        let res: Response = serde_json::from_str(
            r#"{"stat":"OK","fields":["單位名稱","買進金額","賣出金額","買賣差額"],"data":[
                ["自營商(自行買賣)","2,000,000,000","1,500,000,000","500,000,000"],
                ["自營商(避險)","3,000,000,000","3,100,000,000","-100,000,000"],
                ["投信","5,000,000,000","3,765,000,000","1,235,000,000"],
                ["外資及陸資(不含外資自營商)","150,000,000,000","162,345,678,901","-12,345,678,901"],
                ["外資自營商","0","0","0"],
                ["合計","160,000,000,000","170,710,678,901","-10,710,678,901"]
            ]}"#,
        )
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 1, 23).unwrap();
        let flow = parse(date, &res);
        assert_eq!(flow.foreign_net, Some(-123.46));
        assert_eq!(flow.trust_net, Some(12.35));
        assert_eq!(flow.dealer_net, Some(4.0));
        assert_eq!(flow.total_net, Some(-107.11));
    }

    #[tokio::test]
    #[ignore]
    async fn test_visit() {
        dotenv::dotenv().ok();
        let _ = rustls::crypto::ring::default_provider().install_default();
        logging::debug_file_async("開始 visit".to_string());

        let date = NaiveDate::from_ymd_opt(2026, 1, 23).unwrap();
        match visit(date).await {
            Ok(flow) => logging::debug_file_async(format!("flow:{:?}", flow)),
            Err(why) => logging::debug_file_async(format!("Failed to visit because {:?}", why)),
        }

        logging::debug_file_async("結束 visit".to_string());
        logging::flush().await;
    }
}
