//! 内存会话存储 - 参考实现，测试使用
//!
//! 车牌 / 车位的唯一性通过独立的占用索引表达，依赖 DashMap
//! entry API 的按键原子性：同一车牌（或车位）的两个并发 `create`
//! 恰好一个抢到占用，败者观察到冲突。

use async_trait::async_trait;
use carpark_core::error::{StoreError, StoreResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::model::ParkingSession;
use crate::domain::repository::SessionStore;

/// 内存会话存储
#[derive(Default)]
pub struct InMemorySessionStore {
    /// 会话记录，按会话 ID
    sessions: DashMap<String, ParkingSession>,
    /// 在场占用索引：车牌 -> 会话 ID
    active_plates: DashMap<String, String>,
    /// 在场占用索引：车位 -> 会话 ID
    active_lots: DashMap<String, String>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 释放会话持有的占用（仅当占用仍指向该会话时）
    fn release_claims(&self, session: &ParkingSession) {
        self.active_plates
            .remove_if(&session.plate, |_, sid| sid == &session.session_id);
        self.active_lots
            .remove_if(&session.lot_id, |_, sid| sid == &session.session_id);
    }

    fn find_active(&self, claims: &DashMap<String, String>, key: &str) -> Option<ParkingSession> {
        let session_id = claims.get(key)?.value().clone();
        self.sessions
            .get(&session_id)
            .filter(|session| session.is_active)
            .map(|session| session.clone())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn find_active_by_plate(&self, plate: &str) -> StoreResult<Option<ParkingSession>> {
        Ok(self.find_active(&self.active_plates, plate))
    }

    async fn find_active_by_lot(&self, lot_id: &str) -> StoreResult<Option<ParkingSession>> {
        Ok(self.find_active(&self.active_lots, lot_id))
    }

    async fn get_by_id(&self, session_id: &str) -> StoreResult<Option<ParkingSession>> {
        Ok(self.sessions.get(session_id).map(|session| session.clone()))
    }

    async fn create(&self, session: &ParkingSession) -> StoreResult<()> {
        // 先抢车牌占用，再抢车位占用，失败路径回滚已抢到的占用
        match self.active_plates.entry(session.plate.clone()) {
            Entry::Occupied(_) => return Err(StoreError::PlateTaken),
            Entry::Vacant(vacant) => {
                vacant.insert(session.session_id.clone());
            }
        }

        match self.active_lots.entry(session.lot_id.clone()) {
            Entry::Occupied(_) => {
                self.active_plates
                    .remove_if(&session.plate, |_, sid| sid == &session.session_id);
                return Err(StoreError::LotTaken);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(session.session_id.clone());
            }
        }

        match self.sessions.entry(session.session_id.clone()) {
            Entry::Occupied(_) => {
                self.release_claims(session);
                Err(StoreError::DuplicateKey)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(session.clone());
                Ok(())
            }
        }
    }

    async fn close_session(
        &self,
        session_id: &str,
        exit_time: f64,
        fee: f64,
    ) -> StoreResult<ParkingSession> {
        let closed = {
            let mut entry = self
                .sessions
                .get_mut(session_id)
                .ok_or(StoreError::NotFound)?;

            if !entry.is_active {
                return Err(StoreError::AlreadyClosed);
            }

            entry.close(exit_time, fee);
            entry.clone()
        };

        self.release_claims(&closed);
        Ok(closed)
    }
}
