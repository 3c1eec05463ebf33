//! 入场准入领域服务

use std::sync::Arc;

use carpark_core::error::{ParkingError, ParkingResult, StoreError};
use tracing::{info, warn};

use crate::domain::model::ParkingSession;
use crate::domain::repository::SessionStore;

/// 入场准入服务
///
/// 先查后写给出确定性的冲突优先级（车牌冲突先于车位冲突），
/// 真正的唯一性由存储层 `create` 的条件写入保证。
pub struct AdmissionService {
    store: Arc<dyn SessionStore>,
}

impl AdmissionService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// 车辆入场：开启一条新的在场会话
    ///
    /// 调用方保证 `plate` / `lot_id` 非空。
    pub async fn admit(&self, plate: &str, lot_id: &str) -> ParkingResult<ParkingSession> {
        if let Some(existing) = self
            .store
            .find_active_by_plate(plate)
            .await
            .map_err(ParkingError::Storage)?
        {
            warn!(
                plate = %plate,
                session_id = %existing.session_id,
                "admission rejected: plate already parked"
            );
            return Err(ParkingError::PlateAlreadyParked(plate.to_string()));
        }

        if let Some(existing) = self
            .store
            .find_active_by_lot(lot_id)
            .await
            .map_err(ParkingError::Storage)?
        {
            warn!(
                lot_id = %lot_id,
                session_id = %existing.session_id,
                "admission rejected: lot already occupied"
            );
            return Err(ParkingError::LotAlreadyOccupied(lot_id.to_string()));
        }

        let mut session = ParkingSession::open(plate, lot_id);

        match self.store.create(&session).await {
            Ok(()) => {}
            Err(StoreError::DuplicateKey) => {
                // 随机 ID 撞车的概率可以忽略但不为零：换一组 ID 重试一次
                warn!(session_id = %session.session_id, "session id collision, regenerating");
                session.regenerate_ids();
                match self.store.create(&session).await {
                    Ok(()) => {}
                    Err(StoreError::DuplicateKey) => {
                        return Err(ParkingError::Storage(StoreError::DuplicateKey));
                    }
                    Err(err) => return Err(Self::map_create_conflict(err, plate, lot_id)),
                }
            }
            Err(err) => return Err(Self::map_create_conflict(err, plate, lot_id)),
        }

        info!(
            session_id = %session.session_id,
            plate = %plate,
            lot_id = %lot_id,
            "vehicle admitted"
        );
        Ok(session)
    }

    /// 条件写入的竞争败者必须观察到与先查后写一致的冲突错误
    fn map_create_conflict(err: StoreError, plate: &str, lot_id: &str) -> ParkingError {
        match err {
            StoreError::PlateTaken => ParkingError::PlateAlreadyParked(plate.to_string()),
            StoreError::LotTaken => ParkingError::LotAlreadyOccupied(lot_id.to_string()),
            other => ParkingError::Storage(other),
        }
    }
}
