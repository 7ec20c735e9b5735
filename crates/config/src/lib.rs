pub mod schema;
pub mod watcher;

pub use schema::{ChartConfig, CuveConfig, DeviceConfig, PollConfig};
pub use watcher::ConfigWatcher;

use cuve_core::{CuveError, Result, MAX_HISTORY_LEN};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file.  Returns `CuveConfig::default()` if
/// the file doesn't exist so the dashboard always has sensible defaults.
pub fn load(path: impl AsRef<Path>) -> Result<CuveConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(
            "Config file not found at '{}'; using defaults.",
            path.display()
        );
        return Ok(CuveConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| CuveError::Config(format!("cannot read '{}': {e}", path.display())))?;

    parse(&raw)
}

/// Parse and validate a TOML document.
pub fn parse(raw: &str) -> Result<CuveConfig> {
    let config: CuveConfig =
        toml::from_str(raw).map_err(|e| CuveError::Config(format!("TOML parse error: {e}")))?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &CuveConfig) -> Result<()> {
    let periods = [
        ("device.timeout_ms", config.device.timeout_ms),
        ("poll.interval_ms", config.poll.interval_ms),
        ("poll.calibs_interval_ms", config.poll.calibs_interval_ms),
        ("poll.ping_interval_ms", config.poll.ping_interval_ms),
    ];
    for (key, value) in periods {
        if value == 0 {
            return Err(CuveError::Config(format!("{key} must be > 0")));
        }
    }
    if !(1..=MAX_HISTORY_LEN).contains(&config.poll.history_len) {
        return Err(CuveError::Config(format!(
            "poll.history_len must be between 1 and {MAX_HISTORY_LEN}"
        )));
    }
    if !config.poll.estimated_floor.is_finite() {
        return Err(CuveError::Config("poll.estimated_floor must be a finite number".into()));
    }
    if !config.device.base_url.starts_with("http://")
        && !config.device.base_url.starts_with("https://")
    {
        return Err(CuveError::Config(format!(
            "device.base_url must be an http(s) URL, got '{}'",
            config.device.base_url
        )));
    }
    Ok(())
}

/// Return the default config path, honouring `$XDG_CONFIG_HOME`.
pub fn default_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("cuve").join("cuve.toml")
}
