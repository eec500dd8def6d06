use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use super::context::RunContext;
use super::producer::spawn_producer;
use super::worker::{WorkerDeps, spawn_workers};
use crate::engine::SegmentHasher;
use crate::engine::progress::{ProgressBar, flush_progress_remainder};
use crate::source::SegmentSource;
use crate::utils::LogSink;
use crate::utils::config::PROGRESS_UPDATE_BATCH_SIZE;
use crate::{QueueSettings, RunReport};

/// Owns the run's collaborators and drives one run at a time: producer thread, worker pool,
/// join, flush.
pub struct Coordinator {
    source: Arc<dyn SegmentSource>,
    hasher: Arc<dyn SegmentHasher>,
    log: Arc<dyn LogSink>,
    settings: QueueSettings,
    interrupt: Option<Arc<AtomicBool>>,
    progress: Option<ProgressBar>,
}

impl Coordinator {
    pub fn new(
        source: Arc<dyn SegmentSource>,
        hasher: Arc<dyn SegmentHasher>,
        log: Arc<dyn LogSink>,
        settings: QueueSettings,
    ) -> Self {
        Self {
            source,
            hasher,
            log,
            settings,
            interrupt: None,
            progress: None,
        }
    }

    /// Stop producing (and fail the run) once `flag` becomes true. Checked between segments.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Advance `bar` as segments are hashed.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Hash every segment of the source with `worker_count` workers (at least 1).
    /// Returns true when every segment was hashed and no component failed.
    pub fn run(&self, worker_count: usize) -> bool {
        self.run_with_report(worker_count).succeeded
    }

    /// Same as [`Coordinator::run`], with counters for the finished run.
    pub fn run_with_report(&self, worker_count: usize) -> RunReport {
        let start = Instant::now();
        let workers = worker_count.max(1);
        if worker_count == 0 {
            debug!("worker count 0 requested; using 1");
        }

        let (ctx, slots) = RunContext::new(workers, self.settings);
        let ctx = Arc::new(ctx);
        for index in 0..workers {
            ctx.registry.register(index);
        }

        let deps = WorkerDeps {
            hasher: Arc::clone(&self.hasher),
            log: Arc::clone(&self.log),
            progress: self.progress.clone(),
        };
        let worker_handles = spawn_workers(&ctx, slots, &deps);
        let producer_handle = spawn_producer(
            &ctx,
            Arc::clone(&self.source),
            Arc::clone(&self.log),
            self.interrupt.clone(),
        );

        // Panics are already reported by the threads' guards.
        if producer_handle.join().is_err() {
            debug!("producer thread panicked");
        }
        for (index, handle) in worker_handles.into_iter().enumerate() {
            if handle.join().is_err() {
                debug!("worker {} thread panicked", index);
            }
        }

        let hashed = ctx.stats.hashed.load(Ordering::Relaxed);
        flush_progress_remainder(
            self.progress.as_ref(),
            hashed as usize,
            PROGRESS_UPDATE_BATCH_SIZE,
            ctx.stats.progress_deferred.load(Ordering::Relaxed),
        );
        let abandoned = ctx.abandon_leftovers();
        if abandoned > 0 {
            debug!("{} segment(s) left unhashed after cancellation", abandoned);
        }

        let report = RunReport {
            succeeded: ctx.succeeded(),
            workers,
            segments_produced: ctx.stats.produced.load(Ordering::Relaxed),
            segments_hashed: hashed,
            segments_abandoned: abandoned,
            hashed_per_worker: ctx
                .stats
                .hashed_per_worker
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
            cooldowns: ctx.stats.cooldowns.load(Ordering::Relaxed),
            peak_queue_len: ctx.stats.peak_queue_len.load(Ordering::Relaxed),
            elapsed_ms: start.elapsed().as_millis(),
            error: ctx.first_error().map(str::to_string),
        };

        self.log.important(&format!(
            "{} segments hashed by {} {} workers in {} ms ({})",
            report.segments_hashed,
            report.workers,
            self.hasher.name(),
            report.elapsed_ms,
            if report.succeeded { "ok" } else { "failed" }
        ));
        self.log.flush();
        report
    }
}
