//! Public and internal types for the segsig API and pipeline.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// One fixed-size piece of the input, in file order. The last segment of a file may be short.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Sequence number assigned by the source (0-based, strictly increasing).
    pub id: u64,
    pub data: Vec<u8>,
}

impl Segment {
    pub fn new(id: u64, data: Vec<u8>) -> Self {
        Self { id, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Digest bytes produced by a [`SegmentHasher`](crate::engine::SegmentHasher).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Digest(pub Vec<u8>);

impl Digest {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex rendering, two characters per byte.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Digest(bytes.to_vec())
    }
}

/// Queue bound and producer pause used for backpressure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueSettings {
    /// Soft cap on pending segments. 0 disables bound-based backpressure.
    pub max_queue_size: usize,
    /// Producer pause once the queue is full. Zero disables pausing.
    pub cooldown: Duration,
}

impl QueueSettings {
    pub fn unbounded() -> Self {
        Self {
            max_queue_size: 0,
            cooldown: Duration::ZERO,
        }
    }

    /// True when the producer should pause given the current queue length.
    pub fn should_cool_down(&self, queue_len: usize) -> bool {
        self.max_queue_size > 0 && queue_len >= self.max_queue_size && !self.cooldown.is_zero()
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_queue_size: 0,
            cooldown: Duration::from_millis(crate::utils::config::QueueDefaults::COOLDOWN_MS),
        }
    }
}

/// Lib-only options for [`show_file_signatures`](crate::show_file_signatures).
#[derive(Clone, Debug)]
pub struct Opts {
    /// Worker thread count. Must be at least 1.
    pub workers: usize,
    /// Segment size in bytes. Must be at least 1.
    pub segment_size: usize,
    /// Backpressure settings for the pending queue.
    pub queue: QueueSettings,
    /// Hold `info` log entries until the end of the run (signature lines included).
    pub buffer_info: bool,
    /// Show a progress bar of hashed segments.
    pub verbose: bool,
}

impl Default for Opts {
    fn default() -> Self {
        let workers = crate::utils::config::WorkerLimits::current().default_workers();
        let segment_size = crate::utils::config::SEGMENT_SIZE_DEFAULT;
        Self {
            workers,
            segment_size,
            queue: QueueSettings {
                max_queue_size: crate::utils::config::default_max_queue_size(workers, segment_size),
                ..QueueSettings::default()
            },
            buffer_info: false,
            verbose: false,
        }
    }
}

/// Outcome of one run. `succeeded` is the value [`Coordinator::run`](crate::pipeline::Coordinator::run) returns.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub succeeded: bool,
    pub workers: usize,
    pub segments_produced: u64,
    pub segments_hashed: u64,
    /// Segments produced but never hashed because the run was cancelled first.
    pub segments_abandoned: u64,
    /// Segments hashed by each worker, indexed by worker index.
    pub hashed_per_worker: Vec<u64>,
    /// Number of backpressure pauses taken by the producer.
    pub cooldowns: u64,
    /// Largest pending-queue length observed right after an enqueue.
    pub peak_queue_len: usize,
    pub elapsed_ms: u128,
    /// First failure of a failed run.
    pub error: Option<String>,
}
