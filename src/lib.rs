//! Carpark Core 公共库
//!
//! 提供统一的配置加载、错误类型和日志初始化功能

pub mod config;
pub mod error;
pub mod tracing;

pub use config::{
    BillingConfig, CarparkAppConfig, LoggingConfig, PostgresInstanceConfig, RedisPoolConfig,
    app_config, load_config,
};
pub use error::*;
pub use tracing::init_tracing_from_config;
