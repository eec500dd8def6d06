//! Run failures: what can go wrong inside a run and how it is turned into cancellation.

use std::fmt;

use super::context::RunContext;
use crate::utils::LogSink;

/// A failure inside a run. Never returned to the caller; it cancels the run and marks it failed.
#[derive(Debug)]
pub enum RunError {
    /// The segment source failed while reading.
    Source(anyhow::Error),
    /// Hashing or logging failed while a worker handled a segment.
    Processing {
        worker: usize,
        segment_id: u64,
        source: anyhow::Error,
    },
    /// Internal scheduling bug (e.g. a worker woken without a segment).
    ProtocolViolation { worker: usize, detail: &'static str },
    /// A producer or worker thread panicked.
    Panicked { component: String },
    /// Interrupted from outside (Ctrl+C).
    Interrupted,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Source(_) => write!(f, "segment source failed"),
            RunError::Processing {
                worker, segment_id, ..
            } => write!(f, "worker {} failed on segment {}", worker, segment_id),
            RunError::ProtocolViolation { worker, detail } => {
                write!(f, "internal protocol violation (worker {}): {}", worker, detail)
            }
            RunError::Panicked { component } => write!(f, "{} panicked", component),
            RunError::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Source(e) => Some(&**e),
            RunError::Processing { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

/// Log `err` to the sink with its cause, then fail and cancel the run.
pub fn report_failure(ctx: &RunContext, log: &dyn LogSink, err: RunError) {
    let msg = match &err {
        RunError::Source(_) => "Segment source failed",
        RunError::Processing { .. } => "Segment processing failed",
        RunError::ProtocolViolation { .. } => "Internal error",
        RunError::Panicked { .. } => "Thread panicked",
        RunError::Interrupted => "Run interrupted",
    };
    let violation = matches!(err, RunError::ProtocolViolation { .. });
    let err = anyhow::Error::new(err);
    ctx.fail(format!("{:#}", err));
    log.error(msg, &err);
    debug_assert!(!violation, "{:#}", err);
}

/// Reports a panic of the thread it lives on as a run failure, so the rest of the run can
/// still shut down.
pub struct PanicGuard<'a> {
    pub component: String,
    pub ctx: &'a RunContext,
    pub log: &'a dyn LogSink,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            report_failure(
                self.ctx,
                self.log,
                RunError::Panicked {
                    component: std::mem::take(&mut self.component),
                },
            );
        }
    }
}
