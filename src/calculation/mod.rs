/// 個股進階籌碼指標
pub mod chip_indicator;
/// 大盤風險燈號與個股籌碼評價
pub mod evaluation;
/// 缺少資料時的模擬補值
pub mod fill_policy;
/// 5 日、20 日移動統計
pub mod rolling;
