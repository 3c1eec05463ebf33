use async_trait::async_trait;
use carpark_core::error::StoreResult;

use crate::domain::model::ParkingSession;

/// 会话存储接口
///
/// 会话记录集由存储实现独占；准入与结算服务只通过本接口读写，
/// 彼此之间不共享进程内可变状态。
///
/// 唯一性约束（同一车牌 / 同一车位至多一条在场会话）必须由
/// `create` 的条件写入保证：两个并发 `create` 竞争同一车牌或
/// 车位时，恰好一个成功，败者得到 `PlateTaken` / `LotTaken`。
/// 仅靠准入服务的先查后写无法关闭这个竞态窗口。
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 查询该车牌当前的在场会话
    async fn find_active_by_plate(&self, plate: &str) -> StoreResult<Option<ParkingSession>>;

    /// 查询该车位当前的在场会话
    async fn find_active_by_lot(&self, lot_id: &str) -> StoreResult<Option<ParkingSession>>;

    /// 按主键查询会话（无论在场与否）
    async fn get_by_id(&self, session_id: &str) -> StoreResult<Option<ParkingSession>>;

    /// 插入新会话
    ///
    /// 失败信号：`DuplicateKey`（会话 ID 已存在）、
    /// `PlateTaken` / `LotTaken`（条件写入拒绝）。
    async fn create(&self, session: &ParkingSession) -> StoreResult<()>;

    /// 原子关闭会话：仅当会话在场时写入 `exit_time` / `fee` 并下线
    ///
    /// 返回关闭后的记录。失败信号：`NotFound`（ID 不存在）、
    /// `AlreadyClosed`（已被并发结算关闭，首次关闭为准）。
    async fn close_session(
        &self,
        session_id: &str,
        exit_time: f64,
        fee: f64,
    ) -> StoreResult<ParkingSession>;
}
