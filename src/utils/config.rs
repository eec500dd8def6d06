//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    env_prefix: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!(".{pkg}.toml"),
                env_prefix: format!("{}_", pkg.to_uppercase()),
            }
        })
    }

    /// Per-directory config file name, e.g. `.segsig.toml`.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Environment variable name for `key`, e.g. `SEGSIG_WORKERS`.
    pub fn env_var(&self, key: &str) -> String {
        format!("{}{}", self.env_prefix, key)
    }
}

// ---- Worker threads ----

/// Worker count limits.
/// Use [`WorkerLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerLimits {
    /// Available threads (from rayon); set by [`WorkerLimits::current()`].
    pub all_threads: usize,
    /// Minimum worker count.
    pub floor: usize,
    /// Leave one core for the producer when more than this many threads are available.
    pub reserve_producer_above: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            all_threads: 0,
            floor: Self::FLOOR_THREADS,
            reserve_producer_above: Self::RESERVE_PRODUCER_ABOVE,
        }
    }
}

impl WorkerLimits {
    pub const FLOOR_THREADS: usize = 1;
    pub const RESERVE_PRODUCER_ABOVE: usize = 4;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Default worker count: all threads, minus one for the reader on larger machines.
    pub fn default_workers(&self) -> usize {
        let n = if self.all_threads > self.reserve_producer_above {
            self.all_threads - 1
        } else {
            self.all_threads
        };
        n.max(self.floor)
    }
}

// ---- Segment I/O ----

/// Reading thresholds and buffer sizes for the file segment source.
pub struct HashingConsts;

impl HashingConsts {
    /// File size above which the source memory-maps the file (bytes). 100 MB.
    pub const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;
    /// Buffered reader capacity for files below the mmap threshold (bytes). 1 MB.
    pub const READ_BUFFER_SIZE: usize = 1024 * 1024;
}

/// Default segment size (bytes). 1 MiB.
pub const SEGMENT_SIZE_DEFAULT: usize = 1024 * 1024;

// ---- Queue / backpressure ----

pub struct QueueDefaults;

impl QueueDefaults {
    /// Producer pause once the pending queue is full (milliseconds).
    pub const COOLDOWN_MS: u64 = 50;
    /// Fraction of available memory the pending queue may occupy (1/N).
    pub const MEMORY_FRACTION_DIVISOR: u64 = 8;
    /// Upper bound on the derived queue size.
    pub const MAX_DERIVED: usize = 4096;
    /// Fallback queue size per worker when available memory is unknown.
    pub const PER_WORKER_FALLBACK: usize = 4;
}

/// Derive a default pending-queue cap from available memory: at most 1/8 of it in queued
/// segments, clamped to `[workers, MAX_DERIVED]`.
pub fn default_max_queue_size(workers: usize, segment_size: usize) -> usize {
    let workers = workers.max(1);
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    let available = sys.available_memory();
    if available == 0 || segment_size == 0 {
        return workers * QueueDefaults::PER_WORKER_FALLBACK;
    }
    queue_size_for_memory(available, workers, segment_size)
}

/// Pure part of [`default_max_queue_size`], split out for testing.
pub fn queue_size_for_memory(available_bytes: u64, workers: usize, segment_size: usize) -> usize {
    let budget = available_bytes / QueueDefaults::MEMORY_FRACTION_DIVISOR;
    let by_memory = (budget / segment_size.max(1) as u64) as usize;
    let floor = workers.max(1);
    by_memory.clamp(floor, QueueDefaults::MAX_DERIVED.max(floor))
}

// ---- Progress ----

/// Hashed-segment count between progress bar updates.
pub const PROGRESS_UPDATE_BATCH_SIZE: usize = 16;
