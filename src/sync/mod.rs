pub mod batch;
pub mod engine;
pub mod plan;

pub use batch::{BatchReport, SyncOutcome, sync_all_users};
pub use engine::SyncEngine;
pub use plan::SyncPlan;
