use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 停车会话 - 核心实体
///
/// 一次入场创建一条会话记录，出场结算时原子地写入
/// `exit_time` / `fee` 并将 `is_active` 置为 false。
/// 会话关闭后永久保留，用于审计，不会重新打开。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParkingSession {
    /// 会话 ID（主键，创建时生成，不可变）
    pub session_id: String,
    /// 客户 ID（每次入场新生成，仅作关联预留）
    pub customer_id: String,
    /// 车牌号
    pub plate: String,
    /// 车位 ID
    pub lot_id: String,
    /// 创建时间（墙钟，仅供参考）
    pub created_at: DateTime<Utc>,
    /// 计费起点（epoch 秒，含小数）
    pub arrival_time: f64,
    /// 计费终点，结算前为空
    pub exit_time: Option<f64>,
    /// 停车费用，结算前为空
    pub fee: Option<f64>,
    /// 是否在场
    pub is_active: bool,
}

impl ParkingSession {
    /// 开启一个新的在场会话，生成随机标识并打上当前时间戳
    pub fn open(plate: &str, lot_id: &str) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4().to_string(),
            customer_id: Uuid::new_v4().to_string(),
            plate: plate.to_string(),
            lot_id: lot_id.to_string(),
            created_at: now,
            arrival_time: now.timestamp_micros() as f64 / 1_000_000.0,
            exit_time: None,
            fee: None,
            is_active: true,
        }
    }

    /// 主键碰撞时重新生成标识（其余字段不变）
    pub fn regenerate_ids(&mut self) {
        self.session_id = Uuid::new_v4().to_string();
        self.customer_id = Uuid::new_v4().to_string();
    }

    /// 关闭会话：写入结算字段并下线
    ///
    /// 仅供存储实现在其原子更新路径内调用。
    pub fn close(&mut self, exit_time: f64, fee: f64) {
        self.exit_time = Some(exit_time);
        self.fee = Some(fee);
        self.is_active = false;
    }
}

/// 计费报价：给定到达 / 离开时刻的确定性输出
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeeQuote {
    /// 计费分钟数（向上取整到计费粒度）
    pub billed_minutes: f64,
    /// 计费小时数
    pub billed_hours: f64,
    /// 费用（未做展示舍入）
    pub fee: f64,
}

/// 出场结算回执
#[derive(Clone, Debug)]
pub struct SettlementReceipt {
    pub session_id: String,
    pub plate: String,
    pub lot_id: String,
    pub billed_hours: f64,
    pub fee: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_session_is_active_with_fresh_ids() {
        let session = ParkingSession::open("AB-123", "lot-1");
        assert!(session.is_active);
        assert!(session.exit_time.is_none());
        assert!(session.fee.is_none());
        assert_ne!(session.session_id, session.customer_id);
        // arrival_time 与 created_at 来自同一时刻
        let created_secs = session.created_at.timestamp_micros() as f64 / 1_000_000.0;
        assert!((session.arrival_time - created_secs).abs() < f64::EPSILON);
    }

    #[test]
    fn test_regenerate_ids_keeps_payload() {
        let mut session = ParkingSession::open("AB-123", "lot-1");
        let old_session_id = session.session_id.clone();
        let old_arrival = session.arrival_time;

        session.regenerate_ids();

        assert_ne!(session.session_id, old_session_id);
        assert_eq!(session.plate, "AB-123");
        assert_eq!(session.arrival_time, old_arrival);
    }

    #[test]
    fn test_close_sets_settlement_fields_together() {
        let mut session = ParkingSession::open("AB-123", "lot-1");
        session.close(session.arrival_time + 60.0, 2.5);
        assert!(!session.is_active);
        assert_eq!(session.fee, Some(2.5));
        assert!(session.exit_time.is_some());
    }
}
