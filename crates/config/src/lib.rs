//! Daemon configuration: a TOML file (resolved via `XDG_CONFIG_HOME`/`HOME`
//! when not given explicitly) merged with `clap`-derived CLI overrides and
//! validated before the daemon starts.

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::{default_config_path, load, load_file};
pub use types::{CliArgs, DaemonConfig};
