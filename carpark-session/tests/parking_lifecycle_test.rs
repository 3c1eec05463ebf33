// 集成测试套件 - 通过完整的命令处理器栈验证会话生命周期与并发属性
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Barrier;

use carpark_session::application::commands::{EnterLotCommand, ExitLotCommand};
use carpark_session::application::handlers::ParkingCommandHandler;
use carpark_session::config::SessionConfig;
use carpark_session::service::ParkingEngine;

fn test_config() -> Arc<SessionConfig> {
    Arc::new(SessionConfig {
        postgres_url: None,
        redis_url: None,
        key_prefix: "carpark-test".to_string(),
        postgres_max_connections: 5,
        rate_per_hour: 10.0,
        rounding_minutes: 15,
    })
}

async fn handler() -> Arc<ParkingCommandHandler> {
    carpark_core::init_tracing_from_config(None);
    // 未配置任何后端时引擎选择内存存储
    let engine = ParkingEngine::from_session_config(test_config()).await.unwrap();
    engine.handler()
}

fn enter(plate: &str, lot_id: &str) -> EnterLotCommand {
    EnterLotCommand {
        plate: plate.to_string(),
        lot_id: lot_id.to_string(),
    }
}

fn exit(session_id: &str) -> ExitLotCommand {
    ExitLotCommand {
        session_id: session_id.to_string(),
    }
}

#[tokio::test]
async fn test_full_lifecycle_frees_plate_and_lot() -> Result<()> {
    let handler = handler().await;

    let entered = handler.handle_enter_lot(enter("AB-123", "lot-1")).await?;

    let exited = handler.handle_exit_lot(exit(&entered.session_id)).await?;
    assert_eq!(exited.plate, "AB-123");
    assert_eq!(exited.lot_id, "lot-1");
    // 即时出场按第一个 15 分钟粒度计费
    assert_eq!(exited.billed_hours, 0.25);
    assert_eq!(exited.fee, 2.5);

    // 结算后车牌与车位都可再次入场
    let reentered = handler.handle_enter_lot(enter("AB-123", "lot-1")).await?;
    assert_ne!(reentered.session_id, entered.session_id);

    Ok(())
}

#[tokio::test]
async fn test_admission_conflicts_and_priority() -> Result<()> {
    let handler = handler().await;
    handler.handle_enter_lot(enter("AB-123", "lot-1")).await?;

    let err = handler
        .handle_enter_lot(enter("AB-123", "lot-2"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PLATE_ALREADY_PARKED");

    let err = handler
        .handle_enter_lot(enter("CD-456", "lot-1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "LOT_ALREADY_OCCUPIED");

    // 车牌与车位同时冲突时，报车牌冲突
    let err = handler
        .handle_enter_lot(enter("AB-123", "lot-1"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PLATE_ALREADY_PARKED");

    Ok(())
}

#[tokio::test]
async fn test_blank_inputs_rejected_before_store_access() {
    let handler = handler().await;

    let cases = [("", "lot-1"), ("AB-123", ""), ("   ", "lot-1"), ("", "")];
    for (plate, lot_id) in cases {
        let err = handler
            .handle_enter_lot(enter(plate, lot_id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_REQUEST");
    }

    let err = handler.handle_exit_lot(exit("  ")).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_REQUEST");
}

#[tokio::test]
async fn test_exit_unknown_session() {
    let handler = handler().await;
    let err = handler
        .handle_exit_lot(exit("no-such-session"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SESSION_NOT_FOUND");
}

#[tokio::test]
async fn test_exit_twice_keeps_first_settlement() -> Result<()> {
    let handler = handler().await;
    let entered = handler.handle_enter_lot(enter("AB-123", "lot-1")).await?;

    handler.handle_exit_lot(exit(&entered.session_id)).await?;
    let err = handler
        .handle_exit_lot(exit(&entered.session_id))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "ALREADY_EXITED");

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admissions_same_plate_exactly_one_wins() {
    let handler = handler().await;
    let attempts = 8;
    let barrier = Arc::new(Barrier::new(attempts));

    let mut tasks = Vec::new();
    for i in 0..attempts {
        let handler = handler.clone();
        let barrier = barrier.clone();
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            handler
                .handle_enter_lot(enter("AB-123", &format!("lot-{i}")))
                .await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err.code(), "PLATE_ALREADY_PARKED"),
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_admissions_same_lot_exactly_one_wins() {
    let handler = handler().await;
    let attempts = 8;
    let barrier = Arc::new(Barrier::new(attempts));

    let mut tasks = Vec::new();
    for i in 0..attempts {
        let handler = handler.clone();
        let barrier = barrier.clone();
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            handler
                .handle_enter_lot(enter(&format!("PLATE-{i}"), "lot-1"))
                .await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err.code(), "LOT_ALREADY_OCCUPIED"),
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_settlements_exactly_one_wins() {
    let handler = handler().await;
    let entered = handler
        .handle_enter_lot(enter("AB-123", "lot-1"))
        .await
        .unwrap();

    let contenders = 4;
    let barrier = Arc::new(Barrier::new(contenders));

    let mut tasks = Vec::new();
    for _ in 0..contenders {
        let handler = handler.clone();
        let barrier = barrier.clone();
        let session_id = entered.session_id.clone();
        tasks.push(tokio::spawn(async move {
            barrier.wait().await;
            handler.handle_exit_lot(exit(&session_id)).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(response) => {
                successes += 1;
                assert_eq!(response.fee, 2.5);
            }
            Err(err) => assert_eq!(err.code(), "ALREADY_EXITED"),
        }
    }
    assert_eq!(successes, 1);
}
