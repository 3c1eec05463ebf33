use std::sync::Arc;

use carpark_core::error::{ParkingError, ParkingResult};
use tracing::debug;

use crate::application::commands::{
    EnterLotCommand, EnterLotResponse, ExitLotCommand, ExitLotResponse,
};
use crate::domain::service::admission_service::AdmissionService;
use crate::domain::service::settlement_service::SettlementService;

/// 停车命令处理器
///
/// 传输层（HTTP / gRPC，不在本仓库范围内）以命令 DTO 调用本处理器。
/// 入参校验在任何存储访问之前完成。
pub struct ParkingCommandHandler {
    admission: Arc<AdmissionService>,
    settlement: Arc<SettlementService>,
}

impl ParkingCommandHandler {
    pub fn new(admission: Arc<AdmissionService>, settlement: Arc<SettlementService>) -> Self {
        Self {
            admission,
            settlement,
        }
    }

    /// 处理入场命令
    pub async fn handle_enter_lot(
        &self,
        command: EnterLotCommand,
    ) -> ParkingResult<EnterLotResponse> {
        let plate = command.plate.trim();
        let lot_id = command.lot_id.trim();

        if plate.is_empty() || lot_id.is_empty() {
            return Err(ParkingError::InvalidRequest(
                "Missing required parameters: plate and lotId are required".to_string(),
            ));
        }

        debug!(plate = %plate, lot_id = %lot_id, "Handling enter lot command");

        let session = self.admission.admit(plate, lot_id).await?;

        Ok(EnterLotResponse {
            session_id: session.session_id,
        })
    }

    /// 处理出场命令
    pub async fn handle_exit_lot(&self, command: ExitLotCommand) -> ParkingResult<ExitLotResponse> {
        let session_id = command.session_id.trim();

        if session_id.is_empty() {
            return Err(ParkingError::InvalidRequest(
                "Missing required parameter: sessionId".to_string(),
            ));
        }

        debug!(session_id = %session_id, "Handling exit lot command");

        let receipt = self.settlement.settle(session_id).await?;

        Ok(ExitLotResponse {
            plate: receipt.plate,
            lot_id: receipt.lot_id,
            billed_hours: round2(receipt.billed_hours),
            fee: round2(receipt.fee),
        })
    }
}

/// 两位小数展示舍入（存储中的费用保持未舍入值）
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(2.499_999_9), 2.5);
        assert_eq!(round2(0.25), 0.25);
        assert_eq!(round2(10.0), 10.0);
        assert_eq!(round2(1.0 / 3.0), 0.33);
    }
}
