use std::fs;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::types::{CliArgs, DaemonConfig};

/// Resolves the default config file path from `XDG_CONFIG_HOME`, falling
/// back to `$HOME/.config`, per the daemon's documented environment
/// variables.
///
/// # Errors
///
/// Returns [`ConfigError::UnresolvablePath`] if neither variable is set.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join("sentinelfs/config.toml"));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Ok(PathBuf::from(home).join(".config/sentinelfs/config.toml"));
        }
    }
    Err(ConfigError::UnresolvablePath)
}

/// Loads config from `path` if it exists, otherwise returns the default
/// configuration unchanged (a missing file is not an error: the daemon can
/// run entirely off CLI overrides and built-in defaults).
///
/// # Errors
///
/// Returns [`ConfigError::Read`] or [`ConfigError::Parse`] if the file
/// exists but cannot be read or parsed.
pub fn load_file(path: &std::path::Path) -> Result<DaemonConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(DaemonConfig::default()),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Resolves the config path (from `cli.config` or [`default_config_path`]),
/// loads it, layers `cli`'s overrides on top, and validates the result.
///
/// # Errors
///
/// Propagates [`ConfigError`] from path resolution, file loading, or
/// validation.
pub fn load(cli: &CliArgs) -> Result<DaemonConfig, ConfigError> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => default_config_path()?,
    };

    let mut config = load_file(&path)?;
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nonexistent.toml");
        let config = load_file(&path).unwrap();
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn loads_and_overrides_fields_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "session_code = \"secret\"\nchunk_size = 32768\n").unwrap();

        let config = load_file(&path).unwrap();
        assert_eq!(config.session_code, "secret");
        assert_eq!(config.chunk_size, 32768);
        // Unspecified fields keep their defaults.
        assert_eq!(config.remesh_interval_secs, 30);
    }

    #[test]
    fn cli_overrides_take_precedence_over_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "session_code = \"secret\"\nlisten_addr = \"127.0.0.1:1\"\n").unwrap();

        let cli = CliArgs {
            config: Some(path),
            listen_addr: Some("127.0.0.1:9999".to_string()),
            ..CliArgs::default()
        };

        let config = load(&cli).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9999");
    }

    #[test]
    fn rejects_out_of_range_chunk_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "session_code = \"secret\"\nchunk_size = 1\n").unwrap();

        let cli = CliArgs {
            config: Some(path),
            ..CliArgs::default()
        };
        assert!(matches!(load(&cli), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_missing_session_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "chunk_size = 4096\n").unwrap();

        let cli = CliArgs {
            config: Some(path),
            ..CliArgs::default()
        };
        assert!(matches!(load(&cli), Err(ConfigError::Invalid(_))));
    }
}
