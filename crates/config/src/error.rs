use std::path::PathBuf;

use thiserror::Error;

/// Failure loading or validating the daemon's configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file's TOML was malformed.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        /// Path whose contents failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// A loaded value is syntactically valid TOML but out of the range this
    /// daemon accepts.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Neither `$XDG_CONFIG_HOME` nor `$HOME` is set, so no default config
    /// path could be resolved and none was given explicitly.
    #[error("could not resolve a config file path: set --config, XDG_CONFIG_HOME, or HOME")]
    UnresolvablePath,
}
