//! Progress bar utilities for displaying hashing status

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    /// Create a new progress bar configuration
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " segments"
    )))
}

/// Create a counter for unknown total (shows count without percentage)
pub fn create_counter(desc: &'static str) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = 0,
        desc = desc,
        animation = Animation::Classic,
        position = 0,
        unit = " segments"
    )))
}

/// Bar sized to `total` segments when known, otherwise a plain counter.
pub fn segments_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(total) if total > 0 => create_progress_bar(ProgressBarConfig::new(
            total as usize,
            "Hashing",
            Animation::Classic,
        )),
        _ => create_counter("Hashing"),
    }
}

/// Update progress bar if available
/// Uses try_lock to avoid blocking if mutex is contended (non-blocking).
/// Returns false when the bar was busy and `n` was not applied.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) -> bool {
    match pb.try_lock() {
        Ok(mut pb) => {
            let _ = pb.update(n);
            true
        }
        Err(_) => false,
    }
}

/// Final progress update for the remainder after batched updates, plus any batches that
/// [`update_progress_bar`] could not apply.
/// Call once after the workers stop with the same `total` and `chunk_size`.
pub fn flush_progress_remainder(
    pb: Option<&ProgressBar>,
    total: usize,
    chunk_size: usize,
    deferred: usize,
) {
    if let Some(pb) = pb {
        let remaining = total % chunk_size + deferred;
        if remaining > 0
            && let Ok(mut bar) = pb.lock()
        {
            let _ = bar.update(remaining);
            let _ = bar.refresh();
        }
    }
}
