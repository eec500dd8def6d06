//! Pending-segment queue: segments that arrived while every worker was busy.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::Segment;

/// FIFO of unassigned segments. The size cap is enforced by producer backpressure, not here.
#[derive(Default)]
pub struct PendingSegmentQueue {
    pending: Mutex<VecDeque<Segment>>,
}

impl PendingSegmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Segment>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `segment`. Returns the length right after the push.
    pub fn push(&self, segment: Segment) -> usize {
        let mut pending = self.lock();
        pending.push_back(segment);
        pending.len()
    }

    /// Take the oldest pending segment (worker self-serve).
    pub fn pop(&self) -> Option<Segment> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
