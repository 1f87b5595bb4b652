/// 日期與交易日
pub mod datetime;
/// http 請求
pub mod http;
/// 索引工具
pub mod map;
/// 數字與編碼轉換
pub mod text;
