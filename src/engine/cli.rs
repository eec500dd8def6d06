//! CLI command handler: resolve options from defaults, config file, environment and flags; run.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::engine::arg_parser::Cli;
use crate::utils::config::default_max_queue_size;
use crate::utils::{
    apply_env_to_opts, apply_file_to_opts, env_max_queue, load_dotenv, load_settings_toml,
    setup_logging,
};
use crate::{Opts, show_file_signatures_with_interrupt};

/// Build [`Opts`]: defaults → `.segsig.toml` next to the file → env / `.env` → CLI flags.
pub fn resolve_opts(cli: &Cli) -> Opts {
    let dir = cli
        .file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut opts = Opts::default();
    let mut queue_override = None;

    if let Some(file) = load_settings_toml(dir) {
        queue_override = file.max_queue_size();
        apply_file_to_opts(&file, &mut opts);
    }

    load_dotenv(dir);
    queue_override = env_max_queue().or(queue_override);
    apply_env_to_opts(&mut opts);

    if let Some(n) = cli.workers {
        opts.workers = n;
    }
    if let Some(n) = cli.segment_size {
        opts.segment_size = n;
    }
    if let Some(n) = cli.max_queue {
        opts.queue.max_queue_size = n;
        queue_override = Some(n);
    }
    if let Some(ms) = cli.cooldown_ms {
        opts.queue.cooldown = Duration::from_millis(ms);
    }
    if let Some(b) = cli.buffer_info {
        opts.buffer_info = b;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }

    // The default cap depends on the final worker count and segment size.
    if queue_override.is_none() {
        opts.queue.max_queue_size = default_max_queue_size(opts.workers, opts.segment_size);
    }
    opts
}

/// Run the CLI. Returns whether every segment was hashed.
pub fn handle_run(cli: &Cli) -> Result<bool> {
    setup_logging(cli.verbose.unwrap_or(false));
    let opts = resolve_opts(cli);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );

    let interrupt = Arc::new(AtomicBool::new(false));
    let interrupt_handler = Arc::clone(&interrupt);
    ctrlc::set_handler(move || {
        interrupt_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let report = show_file_signatures_with_interrupt(&cli.file, &opts, Some(interrupt))?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if !report.succeeded {
        warn!(
            "Run failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(report.succeeded)
}
