//! Carpark Core 配置模块
//!
//! 该模块提供了完整的应用程序配置管理功能，包括：
//! - 配置文件加载和解析
//! - 计费规则配置（费率、计费粒度）
//! - 存储后端配置（PostgreSQL / Redis）

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::warn;

/// 全局应用配置实例，使用 OnceLock 确保只初始化一次
static APP_CONFIG: OnceLock<CarparkAppConfig> = OnceLock::new();

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 环境变量优先）
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 是否输出日志目标
    #[serde(default)]
    pub with_target: bool,
    /// 是否输出线程 ID
    #[serde(default)]
    pub with_thread_ids: bool,
    /// 是否输出源文件名
    #[serde(default)]
    pub with_file: bool,
    /// 是否输出行号
    #[serde(default)]
    pub with_line_number: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: false,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
        }
    }
}

/// 计费配置
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// 每小时费率（货币单位）
    #[serde(default = "default_rate_per_hour")]
    pub rate_per_hour: f64,
    /// 计费粒度（分钟），不足一个粒度按一个粒度计费
    #[serde(default = "default_rounding_minutes")]
    pub rounding_minutes: u32,
}

fn default_rate_per_hour() -> f64 {
    10.0
}

fn default_rounding_minutes() -> u32 {
    15
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            rate_per_hour: default_rate_per_hour(),
            rounding_minutes: default_rounding_minutes(),
        }
    }
}

/// PostgreSQL 数据库实例配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PostgresInstanceConfig {
    /// 数据库连接 URL
    pub url: String,
    /// 最大连接数
    #[serde(default)]
    pub max_connections: Option<u32>,
}

/// Redis 连接池配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RedisPoolConfig {
    /// Redis 服务器地址
    pub url: String,
    /// 命名空间前缀
    #[serde(default)]
    pub namespace: Option<String>,
}

/// 应用配置根
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CarparkAppConfig {
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 计费配置
    #[serde(default)]
    pub billing: BillingConfig,
    /// PostgreSQL 配置（可选，配置后优先使用）
    #[serde(default)]
    pub postgres: Option<PostgresInstanceConfig>,
    /// Redis 配置（可选）
    #[serde(default)]
    pub redis: Option<RedisPoolConfig>,
}

/// 加载配置
pub fn load_config(path: Option<&str>) -> &'static CarparkAppConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![PathBuf::from("config"), PathBuf::from("config.toml")],
    };

    APP_CONFIG.get_or_init(|| load_with_fallback(&candidates))
}

/// 获取应用配置
pub fn app_config() -> &'static CarparkAppConfig {
    APP_CONFIG.get().expect("configuration not initialised")
}

/// 使用备选方案加载配置
fn load_with_fallback(candidates: &[PathBuf]) -> CarparkAppConfig {
    for path in candidates {
        match load_config_from_source(path) {
            Ok(cfg) => return cfg,
            Err(err) => {
                warn!("failed to load config from {}: {err}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    CarparkAppConfig::default()
}

/// 从源加载配置
fn load_config_from_source(path: &Path) -> Result<CarparkAppConfig> {
    if !path.exists() {
        return Err(anyhow!(
            "configuration path {} does not exist",
            path.display()
        ));
    }

    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    if metadata.is_dir() {
        load_config_from_file(&path.join("base.toml"))
    } else {
        load_config_from_file(path)
    }
}

/// 从文件加载配置
fn load_config_from_file(path: &Path) -> Result<CarparkAppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config file: {}", path.display()))?;
    let cfg: CarparkAppConfig = toml::from_str(&content)
        .with_context(|| format!("invalid config format: {}", path.display()))?;
    Ok(cfg)
}
