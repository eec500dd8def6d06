pub mod config;
pub mod env;
pub mod logger;
pub mod settings_toml;

pub use config::*;
pub use env::{apply_env_to_opts, env_max_queue, load_dotenv};
pub use logger::{ConsoleLog, LogSink, setup_logging};
pub use settings_toml::{apply_file_to_opts, load_settings_toml};
