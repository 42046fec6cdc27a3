//! Application configuration.
//!
//! Read from YAML at `--config` or `<config dir>/nice-autofill/config.yaml`.
//! A missing file means defaults; a few `NICE_AUTOFILL_*` variables override
//! the file afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dom_snapshot::SnapshotOptions;
use nice_core_types::{InputConfig, Speed};
use page_bridge::BridgeVariant;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

pub const ENV_DEBUGGER_URL: &str = "NICE_AUTOFILL_DEBUGGER_URL";
pub const ENV_SPEED: &str = "NICE_AUTOFILL_SPEED";
pub const ENV_HUMAN_MODE: &str = "NICE_AUTOFILL_HUMAN_MODE";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub browser: BrowserSection,
    pub input: InputConfig,
    pub bridge: BridgeSection,
    pub website: WebsiteSection,
    pub relay: RelaySection,
    pub capture: SnapshotOptions,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    /// `http://host:port` of a browser started with `--remote-debugging-port`.
    pub debugger_url: String,
    /// Only tabs whose URL contains this are driven.
    pub host_filter: String,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            debugger_url: "http://127.0.0.1:9222".to_string(),
            host_filter: "dge.neis.go.kr".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSection {
    pub variant: BridgeVariant,
    /// Unset keeps unanswered requests pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
}

impl BridgeSection {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebsiteSection {
    pub url: String,
    pub api_key: String,
}

impl Default for WebsiteSection {
    fn default() -> Self {
        Self {
            url: "https://www.iepon.site".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySection {
    pub notifications: bool,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            notifications: true,
        }
    }
}

/// `<config dir>/nice-autofill/config.yaml`.
pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("nice-autofill");
    path.push("config.yaml");
    Ok(path)
}

impl AppConfig {
    /// Read `path`, or defaults when it does not exist.
    pub async fn load_file(path: &Path) -> Result<Self> {
        if fs::try_exists(path).await? {
            let raw = fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let config = serde_yaml::from_str(&raw)
                .with_context(|| format!("parsing {}", path.display()))?;
            info!("Loaded configuration from: {}", path.display());
            Ok(config)
        } else {
            warn!("Config file not found, using defaults: {}", path.display());
            Ok(Self::default())
        }
    }

    pub async fn save_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let serialized = serde_yaml::to_string(self)?;
        fs::write(path, serialized)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Apply `NICE_AUTOFILL_*` overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_DEBUGGER_URL).filter(|v| !v.trim().is_empty()) {
            info!(debugger_url = %url, "debugger URL from environment");
            self.browser.debugger_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_SPEED) {
            match raw.parse::<Speed>() {
                Ok(speed) => self.input.speed = speed,
                Err(err) => warn!(error = %err, "ignoring {}", ENV_SPEED),
            }
        }
        if let Some(raw) = lookup(ENV_HUMAN_MODE) {
            match parse_flag(&raw) {
                Some(flag) => self.input.human_mode = flag,
                None => warn!(value = %raw, "ignoring {}", ENV_HUMAN_MODE),
            }
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
