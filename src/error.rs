//! Carpark Core 错误模块
//!
//! - `ParkingError`：对外业务错误，每个变体对应一个稳定的错误码
//! - `StoreError`：存储层内部信号，由领域服务消费后映射为业务错误

use thiserror::Error;

/// 业务层结果类型
pub type ParkingResult<T> = std::result::Result<T, ParkingError>;

/// 存储层结果类型
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 对外业务错误
///
/// 校验错误和冲突错误是终态，直接返回调用方，不做重试；
/// `Storage` 表示瞬态基础设施故障。
#[derive(Debug, Error)]
pub enum ParkingError {
    /// 请求参数缺失或为空
    #[error("{0}")]
    InvalidRequest(String),

    /// 该车牌已有在场会话
    #[error("vehicle with license plate {0} is already in the parking lot")]
    PlateAlreadyParked(String),

    /// 该车位已被占用
    #[error("parking lot {0} is already occupied")]
    LotAlreadyOccupied(String),

    /// 会话不存在
    #[error("parking session not found: {0}")]
    SessionNotFound(String),

    /// 会话已经结算
    #[error("vehicle has already exited")]
    AlreadyExited,

    /// 存储故障
    #[error("storage failure: {0}")]
    Storage(#[source] StoreError),
}

impl ParkingError {
    /// 稳定错误码，供调用方和测试按失败类型分支
    pub fn code(&self) -> &'static str {
        match self {
            ParkingError::InvalidRequest(_) => "INVALID_REQUEST",
            ParkingError::PlateAlreadyParked(_) => "PLATE_ALREADY_PARKED",
            ParkingError::LotAlreadyOccupied(_) => "LOT_ALREADY_OCCUPIED",
            ParkingError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            ParkingError::AlreadyExited => "ALREADY_EXITED",
            ParkingError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// 存储层内部信号
///
/// `PlateTaken` / `LotTaken` 来自条件写入：并发入场竞争的败者
/// 必须观察到冲突而不是一个泛化的存储错误。
#[derive(Debug, Error)]
pub enum StoreError {
    /// 会话 ID 已存在
    #[error("session id already exists")]
    DuplicateKey,

    /// 该车牌已有在场会话（条件写入拒绝）
    #[error("an active session already exists for this plate")]
    PlateTaken,

    /// 该车位已有在场会话（条件写入拒绝）
    #[error("an active session already exists for this lot")]
    LotTaken,

    /// 会话不存在
    #[error("session not found")]
    NotFound,

    /// 会话已关闭
    #[error("session already closed")]
    AlreadyClosed,

    /// 后端存储故障
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
