use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::pairing::{PairingConfig, ReconnectPolicy};
use crate::questions::Protocol;

pub const CONFIG_ENV: &str = "DEPLOY_NODE_APP_CONFIG";

pub const DEFAULT_ENV: &str = "production";
pub const DEFAULT_REGISTRY: &str = "registry.kubesail.io";
pub const DEFAULT_CONTEXT: &str = "kubesail";

#[derive(Debug, Default, Deserialize)]
pub struct WizardConfig {
    #[serde(default)]
    pub pairing: PairingSection,
    #[serde(default)]
    pub defaults: DefaultsSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PairingSection {
    /// Socket endpoint the pairing session keeps open.
    pub websocket_url: String,
    /// Browser page that completes registration; receives `session=<id>`.
    pub registration_url: String,
    pub reconnect_delay_ms: u64,
}

impl Default for PairingSection {
    fn default() -> Self {
        Self {
            websocket_url: "wss://localhost:4000/socket.io/".to_string(),
            registration_url: "https://localhost:3000/register".to_string(),
            reconnect_delay_ms: 250,
        }
    }
}

impl PairingSection {
    pub fn to_pairing_config(&self) -> PairingConfig {
        PairingConfig {
            websocket_url: self.websocket_url.clone(),
            registration_url: self.registration_url.clone(),
            reconnect: ReconnectPolicy::fixed(Duration::from_millis(self.reconnect_delay_ms)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    pub port: String,
    pub protocol: Protocol,
    pub entrypoint: String,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            port: "3000".to_string(),
            protocol: Protocol::Http,
            entrypoint: "index.js".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoverySection {
    /// Appended last to the discovered registries.
    pub default_registry: String,
    /// Appended last to the discovered contexts.
    pub default_context: String,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            default_registry: DEFAULT_REGISTRY.to_string(),
            default_context: DEFAULT_CONTEXT.to_string(),
        }
    }
}

/// Load the wizard config. `path_override` comes from `--config`, which clap
/// also fills from [`CONFIG_ENV`].
pub fn load(path_override: Option<&Path>) -> Result<WizardConfig> {
    load_from(path_override.map(Path::to_path_buf))
}

pub fn load_from(path_override: Option<PathBuf>) -> Result<WizardConfig> {
    let Some(path) = path_override.or_else(config_path) else {
        return Ok(WizardConfig::default());
    };

    if !path.exists() {
        return Ok(WizardConfig::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    let config: WizardConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config at {}", path.display()))?;
    Ok(config)
}

pub fn config_path() -> Option<PathBuf> {
    // Prefer XDG-style config path, but fall back to ~/.deploy-node-app/config.toml.
    if let Some(mut dir) = dirs::config_dir() {
        dir.push("deploy-node-app");
        dir.push("config.toml");
        if dir.exists() {
            return Some(dir);
        }
    }
    dirs::home_dir().map(|mut home| {
        home.push(".deploy-node-app");
        home.push("config.toml");
        home
    })
}
