pub mod admission_service;
pub mod fee_calculator;
pub mod settlement_service;

pub use admission_service::AdmissionService;
pub use fee_calculator::FeeSchedule;
pub use settlement_service::SettlementService;
