//! # PostgreSQL 会话存储
//!
//! 车牌 / 车位唯一性用部分唯一索引（`WHERE is_active`）表达，
//! 入场检查与插入因此是单条原子语句；关闭是带 `AND is_active`
//! 条件的 UPDATE，首次关闭为准。

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use carpark_core::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::model::ParkingSession;
use crate::domain::repository::SessionStore;

/// 会话查询行结构（用于SQL查询结果映射）
#[derive(sqlx::FromRow)]
struct SessionRow {
    session_id: String,
    customer_id: String,
    plate: String,
    lot_id: String,
    created_at: DateTime<Utc>,
    arrival_time: f64,
    exit_time: Option<f64>,
    fee: Option<f64>,
    is_active: bool,
}

impl From<SessionRow> for ParkingSession {
    fn from(row: SessionRow) -> Self {
        Self {
            session_id: row.session_id,
            customer_id: row.customer_id,
            plate: row.plate,
            lot_id: row.lot_id,
            created_at: row.created_at,
            arrival_time: row.arrival_time,
            exit_time: row.exit_time,
            fee: row.fee,
            is_active: row.is_active,
        }
    }
}

const SELECT_COLUMNS: &str =
    "session_id, customer_id, plate, lot_id, created_at, arrival_time, exit_time, fee, is_active";

/// PostgreSQL 会话存储
pub struct PostgresSessionStore {
    pool: Arc<PgPool>,
}

impl PostgresSessionStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// 建表与索引（幂等）
    ///
    /// 两个部分唯一索引同时服务唯一性约束和在场查询。
    pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS parking_sessions (
                session_id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                plate TEXT NOT NULL,
                lot_id TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                arrival_time DOUBLE PRECISION NOT NULL,
                exit_time DOUBLE PRECISION,
                fee DOUBLE PRECISION,
                is_active BOOLEAN NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .context("create parking_sessions table")?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS parking_sessions_active_plate_idx
            ON parking_sessions (plate) WHERE is_active
            "#,
        )
        .execute(pool)
        .await
        .context("create active plate index")?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS parking_sessions_active_lot_idx
            ON parking_sessions (lot_id) WHERE is_active
            "#,
        )
        .execute(pool)
        .await
        .context("create active lot index")?;

        Ok(())
    }

    async fn find_active_by(&self, column: &str, key: &str) -> StoreResult<Option<ParkingSession>> {
        let query = format!(
            "SELECT {SELECT_COLUMNS} FROM parking_sessions WHERE {column} = $1 AND is_active"
        );
        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(key)
            .fetch_optional(self.pool.as_ref())
            .await
            .with_context(|| format!("find active session by {column}"))?;
        Ok(row.map(ParkingSession::from))
    }
}

/// 唯一性冲突按约束名区分信号
fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("parking_sessions_pkey") => return StoreError::DuplicateKey,
                Some("parking_sessions_active_plate_idx") => return StoreError::PlateTaken,
                Some("parking_sessions_active_lot_idx") => return StoreError::LotTaken,
                _ => {}
            }
        }
    }
    StoreError::Backend(anyhow::Error::new(err).context("insert parking session"))
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn find_active_by_plate(&self, plate: &str) -> StoreResult<Option<ParkingSession>> {
        self.find_active_by("plate", plate).await
    }

    async fn find_active_by_lot(&self, lot_id: &str) -> StoreResult<Option<ParkingSession>> {
        self.find_active_by("lot_id", lot_id).await
    }

    async fn get_by_id(&self, session_id: &str) -> StoreResult<Option<ParkingSession>> {
        let query =
            format!("SELECT {SELECT_COLUMNS} FROM parking_sessions WHERE session_id = $1");
        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(session_id)
            .fetch_optional(self.pool.as_ref())
            .await
            .context("get session by id")?;
        Ok(row.map(ParkingSession::from))
    }

    async fn create(&self, session: &ParkingSession) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO parking_sessions
                (session_id, customer_id, plate, lot_id, created_at,
                 arrival_time, exit_time, fee, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.customer_id)
        .bind(&session.plate)
        .bind(&session.lot_id)
        .bind(session.created_at)
        .bind(session.arrival_time)
        .bind(session.exit_time)
        .bind(session.fee)
        .bind(session.is_active)
        .execute(self.pool.as_ref())
        .await
        .map_err(map_insert_error)?;

        Ok(())
    }

    async fn close_session(
        &self,
        session_id: &str,
        exit_time: f64,
        fee: f64,
    ) -> StoreResult<ParkingSession> {
        let query = format!(
            r#"
            UPDATE parking_sessions
            SET is_active = FALSE, exit_time = $2, fee = $3
            WHERE session_id = $1 AND is_active
            RETURNING {SELECT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, SessionRow>(&query)
            .bind(session_id)
            .bind(exit_time)
            .bind(fee)
            .fetch_optional(self.pool.as_ref())
            .await
            .context("close session")?;

        match row {
            Some(row) => Ok(row.into()),
            // 条件更新没有命中：区分不存在与已关闭
            None => {
                let probe: Option<(bool,)> =
                    sqlx::query_as("SELECT is_active FROM parking_sessions WHERE session_id = $1")
                        .bind(session_id)
                        .fetch_optional(self.pool.as_ref())
                        .await
                        .context("probe session state")?;

                match probe {
                    Some(_) => Err(StoreError::AlreadyClosed),
                    None => Err(StoreError::NotFound),
                }
            }
        }
    }
}
