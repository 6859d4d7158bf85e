use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::subscriptions::{DeliveryPolicy, ErrorPolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct AssetConfig {
    /// Sprite image paths are resolved below this directory.
    #[serde(default = "AssetConfig::default_root")]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptConfig {
    #[serde(default = "ScriptConfig::default_main_script")]
    pub main_script: PathBuf,
    #[serde(default)]
    pub delivery: DeliveryPolicy,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    /// 0 leaves the engine unbounded.
    #[serde(default)]
    pub max_operations: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_filter")]
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BridgeConfig {
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub scripting: ScriptConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Default)]
pub struct BridgeConfigOverrides {
    pub asset_root: Option<PathBuf>,
    pub main_script: Option<PathBuf>,
    pub log_filter: Option<String>,
}

impl AssetConfig {
    fn default_root() -> PathBuf {
        PathBuf::from("pixmaps")
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self { root: Self::default_root() }
    }
}

impl ScriptConfig {
    fn default_main_script() -> PathBuf {
        PathBuf::from("scripts/main.rhai")
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            main_script: Self::default_main_script(),
            delivery: DeliveryPolicy::default(),
            on_error: ErrorPolicy::default(),
            max_operations: 0,
        }
    }
}

impl LogConfig {
    fn default_filter() -> String {
        "info".to_string()
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: Self::default_filter() }
    }
}

impl BridgeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &BridgeConfigOverrides) {
        if let Some(root) = &overrides.asset_root {
            self.assets.root = root.clone();
        }
        if let Some(script) = &overrides.main_script {
            self.scripting.main_script = script.clone();
        }
        if let Some(filter) = &overrides.log_filter {
            self.logging.filter = filter.clone();
        }
    }
}

impl BridgeConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.asset_root.is_none() && self.main_script.is_none() && self.log_filter.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.asset_root.is_some() {
            fields.push("assets");
        }
        if self.main_script.is_some() {
            fields.push("script");
        }
        if self.log_filter.is_some() {
            fields.push("log");
        }
        fields
    }
}
