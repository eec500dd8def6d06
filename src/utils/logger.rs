use colored::Colorize;
use env_logger::Builder;
use log::Level;
use std::io::Write;
use std::sync::Mutex;

pub fn setup_logging(verbose: bool) {
    use log::LevelFilter;

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // try_init: library callers and tests may already have a logger installed.
    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn) // Default: only warnings from dependencies
        .filter_module(env!("CARGO_PKG_NAME"), level) // Our crate: use requested level
        .format(|buf, record| {
            let name = env!("CARGO_PKG_NAME");
            let line = match record.level() {
                Level::Error | Level::Warn => {
                    let level_str = match record.level() {
                        Level::Warn => "WARN".yellow(),
                        Level::Error => "ERROR".red(),
                        _ => unreachable!(),
                    };
                    let path = record.target().to_string().white();
                    format!("[{} {} {}] {}", name.cyan(), level_str, path, record.args())
                }
                _ => format!("[{}] {}", name.cyan(), record.args()),
            };
            writeln!(buf, "{}", line)
        })
        .try_init();
}

/// Destination for run log entries. Called concurrently from the producer and every worker.
///
/// `flush` is called exactly once per run, after every worker has stopped.
pub trait LogSink: Send + Sync {
    fn info(&self, msg: &str);
    fn important(&self, msg: &str);
    fn error(&self, msg: &str, cause: &anyhow::Error);
    fn flush(&self);

    /// One hashed segment. Default renders an `info` line.
    fn signature(&self, worker: usize, segment_id: u64, digest_hex: &str) {
        self.info(&format!("worker {worker} segment {segment_id}: {digest_hex}"));
    }
}

/// [`LogSink`] over the `log` facade. `important` entries are held until [`LogSink::flush`];
/// with `buffer_info` set, `info` entries (signatures included) are held as well.
#[derive(Default)]
pub struct ConsoleLog {
    buffer_info: bool,
    buffered: Mutex<Vec<String>>,
}

impl ConsoleLog {
    pub fn new(buffer_info: bool) -> Self {
        Self {
            buffer_info,
            buffered: Mutex::new(Vec::new()),
        }
    }

    fn hold(&self, msg: &str) {
        // A poisoned buffer still holds valid lines; keep appending.
        let mut buf = self.buffered.lock().unwrap_or_else(|e| e.into_inner());
        buf.push(msg.to_string());
    }

    /// Entries waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.buffered.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl LogSink for ConsoleLog {
    fn info(&self, msg: &str) {
        if self.buffer_info {
            self.hold(msg);
        } else {
            log::info!("{}", msg);
        }
    }

    fn important(&self, msg: &str) {
        self.hold(msg);
    }

    fn error(&self, msg: &str, cause: &anyhow::Error) {
        log::error!("{}: {:#}", msg, cause);
    }

    fn flush(&self) {
        let lines = std::mem::take(&mut *self.buffered.lock().unwrap_or_else(|e| e.into_inner()));
        for line in lines {
            log::info!("{}", line);
        }
    }
}
