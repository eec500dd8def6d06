//! Producer: reads the segment source and places each segment (hand-off or enqueue).

use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use super::context::RunContext;
use super::error_handler::{PanicGuard, RunError, report_failure};
use crate::Segment;
use crate::source::SegmentSource;
use crate::utils::LogSink;

/// Where a produced segment went.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Given directly to this idle worker.
    HandedOff(usize),
    /// Appended to the pending queue, which then had this length.
    Queued(usize),
}

/// Hand `segment` to the oldest idle worker, or queue it when none is idle.
///
/// The registry lock is released before the slot send, and the queue lock before the caller
/// checks for backpressure; the two locks are never held together.
pub fn place_segment(ctx: &RunContext, segment: Segment) -> Result<Placement, RunError> {
    let picked = ctx.registry.take_oldest();
    match picked {
        Some(worker) => {
            ctx.assign(worker, segment)?;
            Ok(Placement::HandedOff(worker))
        }
        None => {
            let len = ctx.queue.push(segment);
            ctx.stats.record_queue_len(len);
            // A worker that registered between our registry check and the push has already
            // seen an empty queue and is about to wait; give it the oldest pending segment.
            if let Some(worker) = ctx.registry.take_oldest() {
                match ctx.queue.pop() {
                    Some(oldest) => ctx.assign(worker, oldest)?,
                    None => {
                        ctx.registry.register(worker);
                    }
                }
            }
            Ok(Placement::Queued(len))
        }
    }
}

/// Pause while the pending queue is at its cap. Returns the number of pauses taken.
pub fn apply_backpressure(ctx: &RunContext) -> u64 {
    let mut pauses = 0;
    while ctx.settings.should_cool_down(ctx.queue.len()) && !ctx.is_cancelled() {
        thread::sleep(ctx.settings.cooldown);
        pauses += 1;
    }
    if pauses > 0 {
        ctx.stats.cooldowns.fetch_add(pauses, Ordering::Relaxed);
    }
    pauses
}

/// Read every segment from `source` and place it. On normal end of input marks the source
/// exhausted; on failure or cancellation stops early.
pub fn run_producer(
    ctx: &RunContext,
    source: &dyn SegmentSource,
    log: &dyn LogSink,
    interrupt: Option<&AtomicBool>,
) {
    log.info("producer started");
    let segments = match source.produce() {
        Ok(iter) => iter,
        Err(e) => {
            report_failure(ctx, log, RunError::Source(e));
            log.info("producer stopped");
            return;
        }
    };

    let mut completed = true;
    for item in segments {
        if ctx.is_cancelled() {
            debug!("producer: run cancelled, stopping");
            completed = false;
            break;
        }
        if interrupt.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            report_failure(ctx, log, RunError::Interrupted);
            completed = false;
            break;
        }
        let segment = match item {
            Ok(segment) => segment,
            Err(e) => {
                report_failure(ctx, log, RunError::Source(e));
                completed = false;
                break;
            }
        };
        ctx.stats.produced.fetch_add(1, Ordering::Relaxed);
        match place_segment(ctx, segment) {
            Ok(Placement::Queued(_)) => {
                apply_backpressure(ctx);
            }
            Ok(Placement::HandedOff(_)) => {}
            Err(e) => {
                report_failure(ctx, log, e);
                completed = false;
                break;
            }
        }
    }

    if completed {
        ctx.mark_source_exhausted();
        if ctx.shutdown_if_drained() {
            debug!("producer: all workers idle at end of input, shutting down");
        }
    }
    log.info("producer stopped");
}

/// Spawn the producer thread.
pub fn spawn_producer(
    ctx: &Arc<RunContext>,
    source: Arc<dyn SegmentSource>,
    log: Arc<dyn LogSink>,
    interrupt: Option<Arc<AtomicBool>>,
) -> JoinHandle<()> {
    let ctx = Arc::clone(ctx);
    thread::spawn(move || {
        let _guard = PanicGuard {
            component: "producer".to_string(),
            ctx: &ctx,
            log: log.as_ref(),
        };
        run_producer(&ctx, source.as_ref(), log.as_ref(), interrupt.as_deref());
    })
}
