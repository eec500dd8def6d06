//! Engine module: hashing, CLI plumbing, progress and helpers

pub mod arg_parser;
pub mod cli;
pub mod hashing;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::{handle_run, resolve_opts};
pub use hashing::{Blake3Hasher, SegmentHasher, hash_hex};
pub use tools::{format_bytes, parse_size};
