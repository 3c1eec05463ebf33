//! 出场结算领域服务

use std::sync::Arc;

use carpark_core::error::{ParkingError, ParkingResult, StoreError};
use chrono::Utc;
use tracing::{info, warn};

use crate::domain::model::SettlementReceipt;
use crate::domain::repository::SessionStore;
use crate::domain::service::fee_calculator::FeeSchedule;

/// 出场结算服务
///
/// 结算是一次性的：首次成功关闭为准，并发结算的败者得到
/// `AlreadyExited`，已写入的 `exit_time` / `fee` 不会被覆盖。
pub struct SettlementService {
    store: Arc<dyn SessionStore>,
    schedule: FeeSchedule,
}

impl SettlementService {
    pub fn new(store: Arc<dyn SessionStore>, schedule: FeeSchedule) -> Self {
        Self { store, schedule }
    }

    /// 车辆出场：计算费用并关闭会话
    pub async fn settle(&self, session_id: &str) -> ParkingResult<SettlementReceipt> {
        let session = self
            .store
            .get_by_id(session_id)
            .await
            .map_err(ParkingError::Storage)?
            .ok_or_else(|| ParkingError::SessionNotFound(session_id.to_string()))?;

        if !session.is_active {
            return Err(ParkingError::AlreadyExited);
        }

        let exit_time = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        let quote = self.schedule.quote(session.arrival_time, exit_time);

        let closed = match self
            .store
            .close_session(session_id, exit_time, quote.fee)
            .await
        {
            Ok(closed) => closed,
            // 并发结算竞争的败者：首次关闭为准，不重试
            Err(StoreError::AlreadyClosed) => {
                warn!(session_id = %session_id, "settlement lost the close race");
                return Err(ParkingError::AlreadyExited);
            }
            Err(StoreError::NotFound) => {
                return Err(ParkingError::SessionNotFound(session_id.to_string()));
            }
            Err(err) => return Err(ParkingError::Storage(err)),
        };

        info!(
            session_id = %session_id,
            plate = %closed.plate,
            lot_id = %closed.lot_id,
            billed_hours = quote.billed_hours,
            fee = quote.fee,
            "vehicle exited"
        );

        Ok(SettlementReceipt {
            session_id: closed.session_id,
            plate: closed.plate,
            lot_id: closed.lot_id,
            billed_hours: quote.billed_hours,
            fee: quote.fee,
        })
    }
}
