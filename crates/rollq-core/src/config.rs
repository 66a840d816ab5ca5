use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::request::TransferOptions;

/// Global configuration loaded from `~/.config/rollq/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollqConfig {
    /// Maximum number of transfers in flight at once.
    pub window_size: usize,
    /// How long one engine poll may block waiting for activity, in seconds.
    pub poll_timeout_secs: f64,
    /// Reject runs whose effective window is below 2 (otherwise run them sequentially).
    pub strict_window: bool,
    /// Bodies of at least this many bytes are spooled to disk; omit to keep everything in memory.
    #[serde(default)]
    pub spool_threshold_bytes: Option<usize>,
    /// Parent directory for spooled responses (defaults to the system temp dir).
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
    /// Consecutive engine poll faults tolerated before a run gives up on its transfers.
    pub max_poll_faults: u32,
    /// Header lines sent with every request, e.g. `"User-Agent: rollq"`.
    #[serde(default)]
    pub default_headers: Vec<String>,
    /// Engine options applied to every request unless the request overrides them.
    #[serde(default = "TransferOptions::standard")]
    pub options: TransferOptions,
}

impl Default for RollqConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            poll_timeout_secs: 10.0,
            strict_window: true,
            spool_threshold_bytes: Some(64 * 1024),
            spool_dir: None,
            max_poll_faults: 16,
            default_headers: Vec::new(),
            options: TransferOptions::standard(),
        }
    }
}

impl RollqConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.poll_timeout_secs.max(0.0))
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rollq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RollqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RollqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: RollqConfig =
        toml::from_str(&data).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
