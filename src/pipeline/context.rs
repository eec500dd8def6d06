//! Per-run shared state: run flags, the two scheduling structures, worker slots, counters.
//!
//! Created at the start of [`Coordinator::run`](super::Coordinator::run), shared by `Arc`
//! with the producer and every worker, dropped when the run returns.

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use super::error_handler::RunError;
use super::queue::PendingSegmentQueue;
use super::registry::IdleWorkerRegistry;
use crate::{QueueSettings, Segment};

/// Snapshot of the run flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunState {
    pub source_exhausted: bool,
    pub cancelled: bool,
    pub succeeded: bool,
}

/// Counters reported in [`RunReport`](crate::RunReport).
pub struct RunStats {
    pub produced: AtomicU64,
    pub hashed: AtomicU64,
    pub hashed_per_worker: Vec<AtomicU64>,
    pub cooldowns: AtomicU64,
    pub peak_queue_len: AtomicUsize,
    /// Progress updates skipped because the bar was busy; applied once after the run.
    pub progress_deferred: AtomicUsize,
}

impl RunStats {
    fn new(workers: usize) -> Self {
        Self {
            produced: AtomicU64::new(0),
            hashed: AtomicU64::new(0),
            hashed_per_worker: (0..workers).map(|_| AtomicU64::new(0)).collect(),
            cooldowns: AtomicU64::new(0),
            peak_queue_len: AtomicUsize::new(0),
            progress_deferred: AtomicUsize::new(0),
        }
    }

    /// Count one hashed segment for `worker`. Returns the run-wide total so far.
    pub fn record_hashed(&self, worker: usize) -> u64 {
        if let Some(c) = self.hashed_per_worker.get(worker) {
            c.fetch_add(1, Ordering::Relaxed);
        }
        self.hashed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_queue_len(&self, len: usize) {
        self.peak_queue_len.fetch_max(len, Ordering::Relaxed);
    }
}

/// Shared state for one run.
pub struct RunContext {
    worker_count: usize,
    pub settings: QueueSettings,
    pub registry: IdleWorkerRegistry,
    pub queue: PendingSegmentQueue,
    /// Send side of each worker's slot, indexed by worker index.
    slots: Vec<Sender<Segment>>,
    /// Receive side of each slot, kept so segments left behind by stopped workers can be
    /// counted after the run.
    slot_rxs: Vec<Receiver<Segment>>,
    source_exhausted: AtomicBool,
    cancelled: AtomicBool,
    succeeded: AtomicBool,
    cancel_tx: Sender<()>,
    cancel_rx: Receiver<()>,
    first_error: OnceLock<String>,
    pub stats: RunStats,
}

impl RunContext {
    /// Fresh state for `worker_count` workers. Returns the context and each worker's slot receiver.
    pub fn new(worker_count: usize, settings: QueueSettings) -> (Self, Vec<Receiver<Segment>>) {
        let (slots, slot_rxs): (Vec<_>, Vec<_>) = (0..worker_count).map(|_| bounded(1)).unzip();
        let (cancel_tx, cancel_rx) = unbounded();
        let ctx = Self {
            worker_count,
            settings,
            registry: IdleWorkerRegistry::new(),
            queue: PendingSegmentQueue::new(),
            slots,
            slot_rxs: slot_rxs.clone(),
            source_exhausted: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            succeeded: AtomicBool::new(true),
            cancel_tx,
            cancel_rx,
            first_error: OnceLock::new(),
            stats: RunStats::new(worker_count),
        };
        (ctx, slot_rxs)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Put `segment` in `worker`'s slot and wake it. The slot must be empty.
    pub fn assign(&self, worker: usize, segment: Segment) -> Result<(), RunError> {
        let Some(slot) = self.slots.get(worker) else {
            return Err(RunError::ProtocolViolation {
                worker,
                detail: "no such worker slot",
            });
        };
        slot.try_send(segment)
            .map_err(|_| RunError::ProtocolViolation {
                worker,
                detail: "hand-off to a worker whose slot is occupied",
            })
    }

    /// Drain whatever was never hashed: segments still in a slot (handed to a worker that
    /// had already stopped) and segments still pending. Call after every thread has joined.
    pub fn abandon_leftovers(&self) -> u64 {
        let mut left = 0;
        for rx in &self.slot_rxs {
            left += rx.try_iter().count() as u64;
        }
        while self.queue.pop().is_some() {
            left += 1;
        }
        left
    }

    /// Receiver that yields once per waiting worker after [`RunContext::cancel`].
    pub fn cancel_signal(&self) -> &Receiver<()> {
        &self.cancel_rx
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Broadcast shutdown. Idempotent; only the first call signals.
    ///
    /// One token per worker: a worker consumes at most one, since after waking it sees the
    /// `cancelled` flag before it would wait again.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        for _ in 0..self.worker_count {
            let _ = self.cancel_tx.send(());
        }
    }

    /// Mark the run failed and cancel it. The first recorded message is kept for the report.
    pub fn fail(&self, message: String) {
        let _ = self.first_error.set(message);
        self.succeeded.store(false, Ordering::SeqCst);
        self.cancel();
    }

    pub fn first_error(&self) -> Option<&str> {
        self.first_error.get().map(String::as_str)
    }

    pub fn is_source_exhausted(&self) -> bool {
        self.source_exhausted.load(Ordering::SeqCst)
    }

    /// Called by the producer after the last segment was placed.
    pub fn mark_source_exhausted(&self) {
        self.source_exhausted.store(true, Ordering::SeqCst);
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RunState {
        RunState {
            source_exhausted: self.is_source_exhausted(),
            cancelled: self.is_cancelled(),
            succeeded: self.succeeded(),
        }
    }

    /// Cancel when nothing is left to do: source exhausted, queue empty, every worker idle.
    ///
    /// Covers the case where all workers went idle before the producer marked exhaustion.
    pub fn shutdown_if_drained(&self) -> bool {
        if self.is_source_exhausted()
            && self.queue.is_empty()
            && self.registry.len() == self.worker_count
        {
            self.cancel();
            return true;
        }
        false
    }
}
