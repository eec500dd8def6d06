//! Segsig: per-segment content signatures for large files.
//!
//! A single producer streams the file in fixed-size segments while a pool of workers hashes
//! them. Segments go straight to an idle worker when there is one and to a bounded pending
//! queue otherwise; a full queue pauses the producer. See [`pipeline::Coordinator`].

pub mod engine;
pub mod pipeline;
pub mod source;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

use log::debug;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use engine::Blake3Hasher;
use engine::progress::segments_bar;
use pipeline::Coordinator;
use source::{FileSource, SegmentSource};
use utils::ConsoleLog;

/// Result alias used by public segsig API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Reject options the run cannot work with.
pub fn validate_opts(opts: &Opts) -> Result<()> {
    if opts.workers == 0 {
        anyhow::bail!("worker count must be at least 1");
    }
    if opts.segment_size == 0 {
        anyhow::bail!("segment size must be at least 1 byte");
    }
    Ok(())
}

/// Hash every segment of the file at `path` with BLAKE3 and log one signature line per segment.
///
/// Configuration problems (bad options, missing file) are `Err`. A run that fails partway is
/// `Ok` with [`RunReport::succeeded`] false.
pub fn show_file_signatures(path: &Path, opts: &Opts) -> Result<RunReport> {
    show_file_signatures_with_interrupt(path, opts, None)
}

/// [`show_file_signatures`] that also stops producing once `interrupt` is set.
pub fn show_file_signatures_with_interrupt(
    path: &Path,
    opts: &Opts,
    interrupt: Option<Arc<AtomicBool>>,
) -> Result<RunReport> {
    validate_opts(opts)?;
    let source = FileSource::new(path, opts.segment_size)?;
    debug!(
        "{}: {} segment(s) of up to {}",
        source.path().display(),
        source.segment_count_hint().unwrap_or(0),
        engine::format_bytes(source.segment_size() as u64)
    );
    let progress = opts
        .verbose
        .then(|| segments_bar(source.segment_count_hint()));

    let mut coordinator = Coordinator::new(
        Arc::new(source),
        Arc::new(Blake3Hasher),
        Arc::new(ConsoleLog::new(opts.buffer_info)),
        opts.queue,
    );
    if let Some(flag) = interrupt {
        coordinator = coordinator.with_interrupt(flag);
    }
    if let Some(bar) = progress {
        coordinator = coordinator.with_progress(bar);
    }
    Ok(coordinator.run_with_report(opts.workers))
}
