//! Batch engine: the scheduler loop and the service façade callers use.

pub mod scheduler;
pub mod service;

pub use scheduler::{BatchReport, BatchScheduler};
pub use service::BatchService;
