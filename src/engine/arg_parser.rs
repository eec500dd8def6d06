use clap::Parser;
use std::path::PathBuf;

use super::tools::parse_size;

/// Per-segment content signatures for large files.
#[derive(Clone, Debug, Parser)]
#[command(name = "segsig")]
#[command(about = "Hash a file in fixed-size segments on a worker pool and print each segment's signature.")]
pub struct Cli {
    /// File to hash.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Worker thread count. Default: available threads.
    #[arg(long, short = 'w')]
    pub workers: Option<usize>,

    /// Segment size in bytes; accepts K/M/G suffixes (e.g. 4M). Default: 1M.
    #[arg(long, short = 's', value_parser = parse_size_arg)]
    pub segment_size: Option<usize>,

    /// Pending-queue cap before the reader pauses. 0 = unbounded. Default: derived from available memory.
    #[arg(long, short = 'q')]
    pub max_queue: Option<usize>,

    /// Reader pause in milliseconds while the queue is full. 0 = no pause.
    #[arg(long, short = 'c')]
    pub cooldown_ms: Option<u64>,

    /// Hold signature lines until the run ends.
    #[arg(long, short = 'b', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub buffer_info: Option<bool>,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Verbose output and progress bar.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}

fn parse_size_arg(s: &str) -> Result<usize, String> {
    parse_size(s).map_err(|e| e.to_string())
}
