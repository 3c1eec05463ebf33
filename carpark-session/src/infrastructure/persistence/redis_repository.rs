//! Redis 会话存储
//!
//! 会话记录以 JSON 存储；车牌 / 车位唯一性通过 `SET NX` 占用键
//! 表达（按键的短租约），出场用 `SET NX` 关闭键保证首次关闭为准。
//! 会话记录与关闭键都永久保留，用于审计。

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use carpark_core::error::{StoreError, StoreResult};
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::config::SessionConfig;
use crate::domain::model::ParkingSession;
use crate::domain::repository::SessionStore;

pub struct RedisSessionStore {
    client: Arc<redis::Client>,
    config: Arc<SessionConfig>,
}

impl RedisSessionStore {
    pub fn new(client: Arc<redis::Client>, config: Arc<SessionConfig>) -> Self {
        Self { client, config }
    }

    async fn connection(&self) -> StoreResult<ConnectionManager> {
        Ok(ConnectionManager::new(self.client.as_ref().clone())
            .await
            .context("connect to redis")?)
    }

    fn session_key(&self, session_id: &str) -> String {
        format!("{}:session:{}", self.config.key_prefix, session_id)
    }

    fn plate_claim_key(&self, plate: &str) -> String {
        format!("{}:active:plate:{}", self.config.key_prefix, plate)
    }

    fn lot_claim_key(&self, lot_id: &str) -> String {
        format!("{}:active:lot:{}", self.config.key_prefix, lot_id)
    }

    fn closed_claim_key(&self, session_id: &str) -> String {
        format!("{}:closed:{}", self.config.key_prefix, session_id)
    }

    async fn load_session(
        &self,
        conn: &mut ConnectionManager,
        session_id: &str,
    ) -> StoreResult<Option<ParkingSession>> {
        let raw: Option<String> = conn
            .get(self.session_key(session_id))
            .await
            .with_context(|| format!("load session {}", session_id))?;

        match raw {
            Some(raw) => {
                let session: ParkingSession = serde_json::from_str(&raw)
                    .with_context(|| format!("decode session {}", session_id))?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn store_session(
        &self,
        conn: &mut ConnectionManager,
        session: &ParkingSession,
    ) -> StoreResult<()> {
        let raw = serde_json::to_string(session)
            .with_context(|| format!("encode session {}", session.session_id))?;
        let _: () = conn
            .set(self.session_key(&session.session_id), raw)
            .await
            .with_context(|| format!("store session {}", session.session_id))?;
        Ok(())
    }

    async fn find_active_by_claim(&self, claim_key: String) -> StoreResult<Option<ParkingSession>> {
        let mut conn = self.connection().await?;
        let session_id: Option<String> = conn
            .get(&claim_key)
            .await
            .with_context(|| format!("load claim {}", claim_key))?;

        let Some(session_id) = session_id else {
            return Ok(None);
        };

        Ok(self
            .load_session(&mut conn, &session_id)
            .await?
            .filter(|session| session.is_active))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn find_active_by_plate(&self, plate: &str) -> StoreResult<Option<ParkingSession>> {
        self.find_active_by_claim(self.plate_claim_key(plate)).await
    }

    async fn find_active_by_lot(&self, lot_id: &str) -> StoreResult<Option<ParkingSession>> {
        self.find_active_by_claim(self.lot_claim_key(lot_id)).await
    }

    async fn get_by_id(&self, session_id: &str) -> StoreResult<Option<ParkingSession>> {
        let mut conn = self.connection().await?;
        self.load_session(&mut conn, session_id).await
    }

    async fn create(&self, session: &ParkingSession) -> StoreResult<()> {
        let mut conn = self.connection().await?;

        let plate_key = self.plate_claim_key(&session.plate);
        let lot_key = self.lot_claim_key(&session.lot_id);

        // 先抢车牌租约，再抢车位租约，失败路径回滚已抢到的租约
        let plate_claimed: bool = conn
            .set_nx(&plate_key, &session.session_id)
            .await
            .with_context(|| format!("claim plate {}", session.plate))?;
        if !plate_claimed {
            return Err(StoreError::PlateTaken);
        }

        let lot_claimed: bool = conn
            .set_nx(&lot_key, &session.session_id)
            .await
            .with_context(|| format!("claim lot {}", session.lot_id))?;
        if !lot_claimed {
            let _: () = conn
                .del(&plate_key)
                .await
                .with_context(|| format!("release plate claim {}", session.plate))?;
            return Err(StoreError::LotTaken);
        }

        let record_key = self.session_key(&session.session_id);
        let raw = serde_json::to_string(session)
            .with_context(|| format!("encode session {}", session.session_id))?;
        let record_claimed: bool = conn
            .set_nx(&record_key, raw)
            .await
            .with_context(|| format!("store session {}", session.session_id))?;
        if !record_claimed {
            let _: () = conn
                .del(&[plate_key, lot_key])
                .await
                .context("release claims after id collision")?;
            return Err(StoreError::DuplicateKey);
        }

        Ok(())
    }

    async fn close_session(
        &self,
        session_id: &str,
        exit_time: f64,
        fee: f64,
    ) -> StoreResult<ParkingSession> {
        let mut conn = self.connection().await?;

        let mut session = self
            .load_session(&mut conn, session_id)
            .await?
            .ok_or(StoreError::NotFound)?;

        if !session.is_active {
            return Err(StoreError::AlreadyClosed);
        }

        // 关闭键决出并发结算的胜者，首次关闭为准
        let won: bool = conn
            .set_nx(self.closed_claim_key(session_id), exit_time.to_string())
            .await
            .with_context(|| format!("claim close of session {}", session_id))?;
        if !won {
            return Err(StoreError::AlreadyClosed);
        }

        session.close(exit_time, fee);
        self.store_session(&mut conn, &session).await?;

        let _: () = conn
            .del(&[
                self.plate_claim_key(&session.plate),
                self.lot_claim_key(&session.lot_id),
            ])
            .await
            .with_context(|| format!("release claims of session {}", session_id))?;

        Ok(session)
    }
}
