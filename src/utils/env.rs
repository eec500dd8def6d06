//! Environment overrides: process env first, then a `.env` file in the given directory.

use log::warn;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::Opts;
use crate::utils::config::PackagePaths;

fn read_var<T: FromStr>(key: &str) -> Option<T> {
    let name = PackagePaths::get().env_var(key);
    let raw = std::env::var(&name).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid number", name, raw);
            None
        }
    }
}

/// Load `.env` from `dir` (if present) without overriding variables already set.
pub fn load_dotenv(dir: &Path) {
    let env_path = dir.join(".env");
    if env_path.is_file() {
        let _ = dotenvy::from_path(&env_path);
    }
}

/// Queue cap set through the environment, if any.
pub fn env_max_queue() -> Option<usize> {
    read_var("MAX_QUEUE")
}

/// Apply `SEGSIG_WORKERS`, `SEGSIG_MAX_QUEUE` and `SEGSIG_COOLDOWN_MS` to `opts`.
pub fn apply_env_to_opts(opts: &mut Opts) {
    if let Some(n) = read_var::<usize>("WORKERS") {
        opts.workers = n;
    }
    if let Some(n) = env_max_queue() {
        opts.queue.max_queue_size = n;
    }
    if let Some(ms) = read_var::<u64>("COOLDOWN_MS") {
        opts.queue.cooldown = Duration::from_millis(ms);
    }
}
