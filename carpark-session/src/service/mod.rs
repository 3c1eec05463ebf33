use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::application::handlers::ParkingCommandHandler;
use crate::config::SessionConfig;
use crate::domain::repository::SessionStore;
use crate::domain::service::admission_service::AdmissionService;
use crate::domain::service::fee_calculator::FeeSchedule;
use crate::domain::service::settlement_service::SettlementService;
use crate::infrastructure::persistence::memory_repository::InMemorySessionStore;
use crate::infrastructure::persistence::postgres_repository::PostgresSessionStore;
use crate::infrastructure::persistence::redis_repository::RedisSessionStore;

/// 停车会话引擎 - 组合根
///
/// 宿主进程（HTTP / gRPC 服务，不在本仓库范围内）通过
/// `handler()` 暴露的命令处理器接入引擎。
pub struct ParkingEngine {
    handler: Arc<ParkingCommandHandler>,
}

impl ParkingEngine {
    /// 从全局应用配置构建引擎
    pub async fn new() -> Result<Self> {
        use carpark_core::load_config;

        let app_config = load_config(None);
        let session_config = Arc::new(
            SessionConfig::from_app_config(app_config)
                .context("Failed to load parking session configuration")?,
        );

        Self::from_session_config(session_config).await
    }

    /// 从会话配置构建引擎
    ///
    /// 根据配置选择存储后端：
    /// PostgreSQL 优先，其次 Redis，两者都未配置时使用内存存储。
    pub async fn from_session_config(config: Arc<SessionConfig>) -> Result<Self> {
        let store: Arc<dyn SessionStore> = if let Some(ref postgres_url) = config.postgres_url {
            info!("Using PostgreSQL session store");
            let pool = Arc::new(
                PgPoolOptions::new()
                    .max_connections(config.postgres_max_connections)
                    .connect(postgres_url)
                    .await
                    .context("Failed to connect to PostgreSQL")?,
            );
            PostgresSessionStore::ensure_schema(&pool)
                .await
                .context("Failed to initialise parking session schema")?;
            Arc::new(PostgresSessionStore::new(pool))
        } else if let Some(ref redis_url) = config.redis_url {
            info!("Using Redis session store");
            let client = Arc::new(
                redis::Client::open(redis_url.clone()).context("Failed to open Redis client")?,
            );
            Arc::new(RedisSessionStore::new(client, config.clone()))
        } else {
            info!("No storage backend configured, using in-memory session store");
            Arc::new(InMemorySessionStore::new())
        };

        Ok(Self::with_store(store, config.as_ref()))
    }

    /// 用给定存储构建引擎（测试与嵌入场景）
    pub fn with_store(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        let schedule = FeeSchedule::new(config.rate_per_hour, config.rounding_minutes);

        let admission = Arc::new(AdmissionService::new(store.clone()));
        let settlement = Arc::new(SettlementService::new(store, schedule));

        Self {
            handler: Arc::new(ParkingCommandHandler::new(admission, settlement)),
        }
    }

    pub fn handler(&self) -> Arc<ParkingCommandHandler> {
        self.handler.clone()
    }
}
