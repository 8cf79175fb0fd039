//! Configuration: `fmc.toml` in the working directory, overlaid with
//! `FMC_*` environment variables.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Default per-command timeout, matching the change tracker's slowest
/// observed operations with ample headroom.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;

const CONFIG_FILE_NAMES: [&str; 2] = ["fmc.toml", ".fmc.toml"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Executable name or path for the change-tracking CLI.
    pub im_program: String,
    /// Simulate instead of invoking the external CLI.
    pub dry_run: bool,
    /// Per-command timeout in seconds.
    pub timeout_seconds: u64,
    /// Operator identity recorded in the audit ledger.
    pub wwid: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            im_program: "im".to_string(),
            dry_run: false,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            wwid: None,
        }
    }
}

impl AgentConfig {
    /// Operator identity: explicit config, then `$USER`, then "unknown".
    pub fn resolve_wwid(&self) -> String {
        self.wwid
            .clone()
            .or_else(|| env::var("USER").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Load configuration from the first config file found in `dir`, then apply
/// environment overrides.
pub fn load(dir: &Path) -> Result<AgentConfig> {
    let mut config = AgentConfig::default();
    for name in CONFIG_FILE_NAMES {
        let path = dir.join(name);
        if path.is_file() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("read config {}", path.display()))?;
            config = toml::from_str(&text)
                .with_context(|| format!("parse config {}", path.display()))?;
            break;
        }
    }
    apply_env_overrides(&mut config, |key| env::var(key).ok());
    Ok(config)
}

fn apply_env_overrides(config: &mut AgentConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(value) = get("FMC_IM_PROGRAM") {
        config.im_program = value;
    }
    if let Some(value) = get("FMC_DRY_RUN") {
        config.dry_run = parse_bool(&value);
    }
    if let Some(value) = get("FMC_TIMEOUT_SECONDS") {
        if let Ok(seconds) = value.trim().parse() {
            config.timeout_seconds = seconds;
        }
    }
    if let Some(value) = get("FMC_WWID") {
        config.wwid = Some(value);
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
