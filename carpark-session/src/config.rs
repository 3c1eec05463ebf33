use std::env;

use anyhow::Result;
use carpark_core::config::CarparkAppConfig;

/// 停车会话服务配置
///
/// 从应用配置解析，环境变量优先于配置文件。
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub postgres_url: Option<String>,
    pub redis_url: Option<String>,
    /// Redis 键前缀
    pub key_prefix: String,
    pub postgres_max_connections: u32,
    /// 每小时费率
    pub rate_per_hour: f64,
    /// 计费粒度（分钟）
    pub rounding_minutes: u32,
}

impl SessionConfig {
    /// 从应用配置加载
    pub fn from_app_config(app: &CarparkAppConfig) -> Result<Self> {
        let postgres_url = env::var("CARPARK_POSTGRES_URL")
            .ok()
            .or_else(|| app.postgres.as_ref().map(|profile| profile.url.clone()));

        let redis_url = env::var("CARPARK_REDIS_URL")
            .ok()
            .or_else(|| app.redis.as_ref().map(|profile| profile.url.clone()));

        let key_prefix = env::var("CARPARK_KEY_PREFIX")
            .ok()
            .or_else(|| app.redis.as_ref().and_then(|profile| profile.namespace.clone()))
            .unwrap_or_else(|| "carpark".to_string());

        let postgres_max_connections = app
            .postgres
            .as_ref()
            .and_then(|profile| profile.max_connections)
            .unwrap_or(5);

        let rate_per_hour = env::var("CARPARK_RATE_PER_HOUR")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(app.billing.rate_per_hour);

        let rounding_minutes = env::var("CARPARK_ROUNDING_MINUTES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(app.billing.rounding_minutes);

        Ok(Self {
            postgres_url,
            redis_url,
            key_prefix,
            postgres_max_connections,
            rate_per_hour,
            rounding_minutes,
        })
    }
}
