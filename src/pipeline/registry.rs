//! Idle-worker registry: worker indices eligible for direct hand-off, oldest first.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// FIFO set of idle worker indices. Membership is the only source of truth for "idle".
#[derive(Default)]
pub struct IdleWorkerRegistry {
    idle: Mutex<VecDeque<usize>>,
}

impl IdleWorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<usize>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `worker` at the back. Returns false (and changes nothing) if it was already idle.
    pub fn register(&self, worker: usize) -> bool {
        let mut idle = self.lock();
        if idle.contains(&worker) {
            return false;
        }
        idle.push_back(worker);
        true
    }

    /// Remove and return the worker that has been idle longest.
    pub fn take_oldest(&self) -> Option<usize> {
        self.lock().pop_front()
    }

    /// Remove `worker` if present. False means someone already took it.
    pub fn remove(&self, worker: usize) -> bool {
        let mut idle = self.lock();
        match idle.iter().position(|&w| w == worker) {
            Some(pos) => {
                idle.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, worker: usize) -> bool {
        self.lock().contains(&worker)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
