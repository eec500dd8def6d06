//! Load `.segsig.toml` from a directory (CLI only). Lib callers pass [`Opts`] directly.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::Opts;
use crate::utils::config::PackagePaths;

#[derive(Debug, Default, Deserialize)]
pub struct SettingsToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    workers: Option<usize>,
    segment_size: Option<usize>,
    max_queue_size: Option<usize>,
    cooldown_ms: Option<u64>,
    buffer_info: Option<bool>,
    verbose: Option<bool>,
}

impl SettingsToml {
    /// Queue cap set in the file, if any.
    pub fn max_queue_size(&self) -> Option<usize> {
        self.settings.max_queue_size
    }
}

/// Load the package config file from `dir` if present. Returns None if missing or unreadable.
pub fn load_settings_toml(dir: &Path) -> Option<SettingsToml> {
    let path = dir.join(PackagePaths::get().config_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_settings_toml(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub fn parse_settings_toml(s: &str) -> Result<SettingsToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before env and CLI.
pub fn apply_file_to_opts(file: &SettingsToml, opts: &mut Opts) {
    let sec = &file.settings;
    apply_file_opt!(sec, opts, workers => workers);
    apply_file_opt!(sec, opts, segment_size => segment_size);
    apply_file_opt!(sec, opts, max_queue_size => queue.max_queue_size);
    if let Some(ms) = sec.cooldown_ms {
        opts.queue.cooldown = Duration::from_millis(ms);
    }
    apply_file_opt!(sec, opts, buffer_info => buffer_info);
    apply_file_opt!(sec, opts, verbose => verbose);
}
