//! 停车会话服务
//!
//! 负责停车会话的生命周期管理和计费：
//! - 入场准入：校验车牌 / 车位无在场会话后开启新会话
//! - 出场结算：计算停车时长与费用并原子关闭会话
//! - 会话存储抽象：内存 / Redis / PostgreSQL 三种实现

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod service;
