use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// 指標數值的來源
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, AsRefStr, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// 全部取自資料來源
    Fetched,
    /// 全部由模擬補值
    Simulated,
    /// 部分取得、部分模擬
    Partial,
}

/// 風險燈號
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, AsRefStr, Serialize)]
pub enum RiskLevel {
    #[strum(serialize = "安全")]
    #[serde(rename = "安全")]
    Safe,
    #[strum(serialize = "警戒")]
    #[serde(rename = "警戒")]
    Caution,
    #[strum(serialize = "危險")]
    #[serde(rename = "危險")]
    Danger,
    #[strum(serialize = "中性")]
    #[serde(rename = "中性")]
    Neutral,
    #[strum(serialize = "無資料")]
    #[serde(rename = "無資料")]
    NoData,
}

/// 個股籌碼評價
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, AsRefStr, Serialize)]
pub enum ChipsRating {
    #[strum(serialize = "主力積極買進")]
    #[serde(rename = "主力積極買進")]
    StrongBuy,
    #[strum(serialize = "偏多")]
    #[serde(rename = "偏多")]
    Bullish,
    #[strum(serialize = "中性")]
    #[serde(rename = "中性")]
    Neutral,
    #[strum(serialize = "偏空")]
    #[serde(rename = "偏空")]
    Bearish,
    #[strum(serialize = "主力積極賣出")]
    #[serde(rename = "主力積極賣出")]
    StrongSell,
}

/// 總覽表上的大盤指標
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter)]
pub enum MarketIndicator {
    #[strum(serialize = "美債10年殖利率")]
    Us10y,
    #[strum(serialize = "黃金指數 (GC=F)")]
    Gold,
    #[strum(serialize = "美元/台幣匯率")]
    UsdTwd,
    #[strum(serialize = "費半指數 (SOX)")]
    Sox,
    #[strum(serialize = "恐慌指數 (VIX)")]
    Vix,
    #[strum(serialize = "加權指數")]
    Taiex,
    #[strum(serialize = "外資現貨")]
    ForeignNet,
    #[strum(serialize = "投信現貨")]
    TrustNet,
    #[strum(serialize = "選擇權 P/C Ratio")]
    PutCallRatio,
    #[strum(serialize = "三大法人合計")]
    TotalNet,
    #[strum(serialize = "外資期貨未平倉")]
    ForeignFutures,
    #[strum(serialize = "融資融券變化")]
    MarginChange,
}

impl MarketIndicator {
    pub fn category(&self) -> &'static str {
        match self {
            MarketIndicator::Us10y | MarketIndicator::Gold => "總經",
            MarketIndicator::UsdTwd => "貨幣",
            MarketIndicator::Sox | MarketIndicator::Taiex => "現貨",
            MarketIndicator::Vix => "情緒",
            MarketIndicator::ForeignNet
            | MarketIndicator::TrustNet
            | MarketIndicator::PutCallRatio
            | MarketIndicator::TotalNet
            | MarketIndicator::ForeignFutures => "籌碼",
            MarketIndicator::MarginChange => "結算",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            MarketIndicator::Us10y | MarketIndicator::PutCallRatio => "%",
            MarketIndicator::Gold => "$",
            MarketIndicator::ForeignNet
            | MarketIndicator::TrustNet
            | MarketIndicator::TotalNet
            | MarketIndicator::MarginChange => "億",
            MarketIndicator::ForeignFutures => "口",
            MarketIndicator::Taiex => "點",
            MarketIndicator::UsdTwd | MarketIndicator::Sox | MarketIndicator::Vix => "",
        }
    }

    /// Yahoo Finance 上的代碼，僅國際指標有
    pub fn yahoo_symbol(&self) -> Option<&'static str> {
        match self {
            MarketIndicator::Us10y => Some("^TNX"),
            MarketIndicator::Gold => Some("GC=F"),
            MarketIndicator::UsdTwd => Some("TWD=X"),
            MarketIndicator::Sox => Some("^SOX"),
            MarketIndicator::Vix => Some("^VIX"),
            _ => None,
        }
    }
}
