use serde::{Deserialize, Serialize};

/// 车辆入场命令
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterLotCommand {
    pub plate: String,
    pub lot_id: String,
}

/// 车辆出场命令
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitLotCommand {
    pub session_id: String,
}

/// 入场响应
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnterLotResponse {
    pub session_id: String,
}

/// 出场响应（金额与时长已做两位小数展示舍入）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitLotResponse {
    pub plate: String,
    pub lot_id: String,
    pub billed_hours: f64,
    pub fee: f64,
}
