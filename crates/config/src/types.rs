use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fully resolved daemon configuration: file contents merged with CLI
/// overrides and validated.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Directory tree this daemon watches and synchronizes.
    pub watched_root: PathBuf,
    /// Address this daemon listens for peer connections on.
    pub listen_addr: String,
    /// Shared secret presented during the session handshake.
    pub session_code: String,
    /// Chunk size proposed for block transfers, in bytes.
    pub chunk_size: u32,
    /// Maximum unacknowledged `BLOCK_DATA` chunks in flight per transfer.
    pub block_window_size: u32,
    /// Historical versions retained per path.
    pub version_retention: usize,
    /// Upload bandwidth ceiling in bytes/sec; `None` means unlimited.
    pub upload_limit_bps: Option<u64>,
    /// Download bandwidth ceiling in bytes/sec; `None` means unlimited.
    pub download_limit_bps: Option<u64>,
    /// How often the auto-remesh loop re-evaluates peer quality, in seconds.
    pub remesh_interval_secs: u64,
    /// Certificate pinning mode: `none`, `tofu`, `strict`, or `spki_only`.
    pub pin_mode: String,
    /// Seed peer addresses to attempt on startup.
    pub seed_peers: Vec<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            watched_root: PathBuf::from("."),
            listen_addr: "0.0.0.0:9031".to_string(),
            session_code: String::new(),
            chunk_size: 65536,
            block_window_size: 32,
            version_retention: 5,
            upload_limit_bps: None,
            download_limit_bps: None,
            remesh_interval_secs: 30,
            pin_mode: "tofu".to_string(),
            seed_peers: Vec::new(),
        }
    }
}

impl DaemonConfig {
    /// Checks every field is within the range this daemon accepts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first field that fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const MIN_CHUNK_SIZE: u32 = 1024;
        const MAX_CHUNK_SIZE: u32 = 16 * 1024 * 1024;

        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be between {MIN_CHUNK_SIZE} and {MAX_CHUNK_SIZE}, got {}",
                self.chunk_size
            )));
        }
        if self.block_window_size == 0 {
            return Err(ConfigError::Invalid("block_window_size must be at least 1".to_string()));
        }
        if self.version_retention == 0 {
            return Err(ConfigError::Invalid("version_retention must be at least 1".to_string()));
        }
        if self.remesh_interval_secs == 0 {
            return Err(ConfigError::Invalid("remesh_interval_secs must be at least 1".to_string()));
        }
        if !matches!(self.pin_mode.as_str(), "none" | "tofu" | "strict" | "spki_only") {
            return Err(ConfigError::Invalid(format!(
                "pin_mode must be one of none/tofu/strict/spki_only, got {:?}",
                self.pin_mode
            )));
        }
        if self.session_code.is_empty() {
            return Err(ConfigError::Invalid("session_code must not be empty".to_string()));
        }
        Ok(())
    }
}

/// CLI overrides layered on top of a loaded [`DaemonConfig`].
#[derive(Clone, Debug, Default, Parser)]
#[command(name = "sentinelfsd", about = "SentinelFS peer-to-peer sync daemon")]
pub struct CliArgs {
    /// Path to a TOML config file; defaults to `$XDG_CONFIG_HOME/sentinelfs/config.toml`.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// This daemon's own peer id, presented during every session handshake.
    /// Defaults to a process-derived id when not given.
    #[arg(long)]
    pub peer_id: Option<String>,
    /// Directory to watch and synchronize; overrides the config file.
    #[arg(long)]
    pub watched_root: Option<PathBuf>,
    /// Address to listen on; overrides the config file.
    #[arg(long)]
    pub listen_addr: Option<String>,
    /// Increase log verbosity; repeatable (`-v`, `-vv`).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Force the most verbose log level regardless of `-v` count.
    #[arg(long)]
    pub debug: bool,
    /// Suppress all but error-level logs.
    #[arg(long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Applies this CLI's overrides onto a loaded config.
    pub fn apply(&self, config: &mut DaemonConfig) {
        if let Some(root) = &self.watched_root {
            config.watched_root = root.clone();
        }
        if let Some(addr) = &self.listen_addr {
            config.listen_addr = addr.clone();
        }
    }
}
