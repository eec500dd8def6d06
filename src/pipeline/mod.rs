//! Run pipeline: shared run context, scheduling structures, producer, workers, coordinator.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod producer;
pub mod queue;
pub mod registry;
pub mod worker;

pub use context::{RunContext, RunState, RunStats};
pub use error_handler::{PanicGuard, RunError, report_failure};
pub use orchestrator::Coordinator;
pub use producer::{Placement, apply_backpressure, place_segment, run_producer, spawn_producer};
pub use queue::PendingSegmentQueue;
pub use registry::IdleWorkerRegistry;
pub use worker::{Worker, WorkerDeps, WorkerState, spawn_workers};
