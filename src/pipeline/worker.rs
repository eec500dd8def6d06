//! Hashing workers.
//!
//! Each worker is a small state machine:
//!
//! ```text
//! WaitingForWork ──segment──▶ Hashing ──▶ SelfServe ──pending──▶ Hashing
//!      ▲   │                                 │
//!      │   └─cancelled──▶ Shutdown ◀──exhausted (cancels the run)
//!      └────────── GoIdle ◀──────────────────┘ (queue empty, source active)
//! ```

use crossbeam_channel::{Receiver, select};
use log::debug;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use super::context::RunContext;
use super::error_handler::{PanicGuard, RunError, report_failure};
use crate::Segment;
use crate::engine::SegmentHasher;
use crate::engine::progress::{ProgressBar, update_progress_bar};
use crate::utils::LogSink;
use crate::utils::config::PROGRESS_UPDATE_BATCH_SIZE;

/// Worker states. `Shutdown` is terminal.
#[derive(Debug)]
pub enum WorkerState {
    WaitingForWork,
    Hashing(Segment),
    SelfServe,
    GoIdle,
    Shutdown,
}

/// Shared, read-only dependencies of every worker in a run.
#[derive(Clone)]
pub struct WorkerDeps {
    pub hasher: Arc<dyn SegmentHasher>,
    pub log: Arc<dyn LogSink>,
    pub progress: Option<ProgressBar>,
}

pub struct Worker {
    index: usize,
    slot: Receiver<Segment>,
    ctx: Arc<RunContext>,
    deps: WorkerDeps,
}

impl Worker {
    pub fn new(
        index: usize,
        slot: Receiver<Segment>,
        ctx: Arc<RunContext>,
        deps: WorkerDeps,
    ) -> Self {
        Self {
            index,
            slot,
            ctx,
            deps,
        }
    }

    /// Drive the state machine until `Shutdown`.
    pub fn run(self) {
        let _guard = PanicGuard {
            component: format!("worker {}", self.index),
            ctx: &self.ctx,
            log: self.deps.log.as_ref(),
        };
        self.deps.log.info(&format!("worker {} started", self.index));

        let mut state = WorkerState::WaitingForWork;
        loop {
            state = match state {
                WorkerState::WaitingForWork => self.wait_for_work(),
                WorkerState::Hashing(segment) => self.hash_segment(segment),
                WorkerState::SelfServe => self.self_serve(),
                WorkerState::GoIdle => self.go_idle(),
                WorkerState::Shutdown => break,
            };
        }

        self.deps.log.info(&format!("worker {} stopped", self.index));
    }

    /// Block until a segment lands in our slot or the run is cancelled.
    /// A segment already in the slot wins: it was handed off before the cancel.
    fn wait_for_work(&self) -> WorkerState {
        if let Ok(segment) = self.slot.try_recv() {
            return WorkerState::Hashing(segment);
        }
        if self.ctx.is_cancelled() {
            return WorkerState::Shutdown;
        }
        select! {
            // Unreachable while we hold the context: it owns every slot's sender.
            recv(self.slot) -> msg => match msg {
                Ok(segment) => WorkerState::Hashing(segment),
                Err(_) => self.protocol_violation("woken without a segment"),
            },
            recv(self.ctx.cancel_signal()) -> _ => match self.slot.try_recv() {
                Ok(segment) => WorkerState::Hashing(segment),
                Err(_) => WorkerState::Shutdown,
            },
        }
    }

    fn hash_segment(&self, segment: Segment) -> WorkerState {
        match self.deps.hasher.hash(&segment.data) {
            Ok(digest) => {
                self.deps
                    .log
                    .signature(self.index, segment.id, &digest.to_hex());
                let total = self.ctx.stats.record_hashed(self.index);
                if let Some(pb) = &self.deps.progress
                    && total.is_multiple_of(PROGRESS_UPDATE_BATCH_SIZE as u64)
                    && !update_progress_bar(pb, PROGRESS_UPDATE_BATCH_SIZE)
                {
                    self.ctx
                        .stats
                        .progress_deferred
                        .fetch_add(PROGRESS_UPDATE_BATCH_SIZE, Ordering::Relaxed);
                }
                WorkerState::SelfServe
            }
            Err(source) => {
                report_failure(
                    &self.ctx,
                    self.deps.log.as_ref(),
                    RunError::Processing {
                        worker: self.index,
                        segment_id: segment.id,
                        source,
                    },
                );
                WorkerState::Shutdown
            }
        }
    }

    /// Pull the oldest pending segment for ourselves.
    ///
    /// The exhaustion flag is read before the pop: the producer sets it only after its last
    /// push, so an empty queue seen after a set flag is final.
    fn self_serve(&self) -> WorkerState {
        let exhausted = self.ctx.is_source_exhausted();
        if let Some(segment) = self.ctx.queue.pop() {
            return WorkerState::Hashing(segment);
        }
        if exhausted {
            // Nothing pending and nothing more coming: end the run.
            debug!("worker {}: queue drained and source exhausted", self.index);
            self.ctx.cancel();
            return WorkerState::Shutdown;
        }
        WorkerState::GoIdle
    }

    /// Register as idle, then re-check the queue and the source: the producer may have queued
    /// a segment or finished between our self-serve check and the registration.
    fn go_idle(&self) -> WorkerState {
        self.ctx.registry.register(self.index);
        let exhausted = self.ctx.is_source_exhausted();
        if !self.ctx.queue.is_empty() {
            if self.ctx.registry.remove(self.index) {
                return WorkerState::SelfServe;
            }
            // The producer already picked us; a segment is on its way to our slot.
            return WorkerState::WaitingForWork;
        }
        if exhausted {
            self.ctx.cancel();
        }
        WorkerState::WaitingForWork
    }

    fn protocol_violation(&self, detail: &'static str) -> WorkerState {
        report_failure(
            &self.ctx,
            self.deps.log.as_ref(),
            RunError::ProtocolViolation {
                worker: self.index,
                detail,
            },
        );
        WorkerState::Shutdown
    }
}

/// Spawn one thread per slot receiver. Worker `i` owns `slots[i]`.
pub fn spawn_workers(
    ctx: &Arc<RunContext>,
    slots: Vec<Receiver<Segment>>,
    deps: &WorkerDeps,
) -> Vec<JoinHandle<()>> {
    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            let worker = Worker::new(index, slot, Arc::clone(ctx), deps.clone());
            thread::spawn(move || worker.run())
        })
        .collect()
}
