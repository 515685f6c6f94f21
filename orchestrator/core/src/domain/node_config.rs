// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Factory Configuration Types
//
// Defines the configuration schema for a Nibble factory node, including:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Factory identity
// - Registry write-authorization policy
// - Event bus sizing and empty-batch emission
// - Logging settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::domain::policy::{RegistryPolicy, WritePolicy};
use crate::domain::principal::Principal;

pub const API_VERSION: &str = "nibble.dev/v1";
pub const KIND: &str = "FactoryConfig";

/// Top-level Kubernetes-style factory configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactoryConfigManifest {
    /// API version (must be "nibble.dev/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "FactoryConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: FactoryConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Factory name. Seeds the factory address when none is configured.
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactoryConfigSpec {
    #[serde(default)]
    pub factory: FactoryIdentity,

    #[serde(default)]
    pub authorization: AuthorizationConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactoryIdentity {
    /// Hex principal of the factory (optional, derived from metadata.name)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Principal>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    /// "conjunctive" (agent AND human writer) or "disjunctive" (either)
    #[serde(default)]
    pub write_policy: WritePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Broadcast buffer size
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,

    /// Emit batch events for zero-length batches
    #[serde(default = "default_true")]
    pub emit_empty_batches: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("compact" or "json")
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_true() -> bool {
    true
}

fn default_event_capacity() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
            emit_empty_batches: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for FactoryConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "nibble-factory".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: FactoryConfigSpec::default(),
        }
    }
}

impl FactoryConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. NIBBLE_CONFIG_PATH environment variable
    /// 2. ./nibble-config.yaml (working directory)
    /// 3. ~/.nibble/config.yaml (user home)
    /// 4. /etc/nibble/config.yaml (system, Unix) or C:\ProgramData\Nibble\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("NIBBLE_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./nibble-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".nibble").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/nibble/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Nibble\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default.
    ///
    /// An explicit path must exist and parse.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?
        } else if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(config_path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `NIBBLE_WRITE_POLICY` and `NIBBLE_LOG_LEVEL`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Same as [`Self::apply_env_overrides`] with an injectable lookup.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("NIBBLE_WRITE_POLICY") {
            match val.parse::<WritePolicy>() {
                Ok(policy) => {
                    tracing::info!("Environment override: NIBBLE_WRITE_POLICY={}", policy);
                    self.spec.authorization.write_policy = policy;
                }
                Err(e) => {
                    tracing::warn!("{}. Ignoring NIBBLE_WRITE_POLICY.", e);
                }
            }
        }

        if let Some(level) = lookup("NIBBLE_LOG_LEVEL") {
            tracing::info!("Environment override: NIBBLE_LOG_LEVEL={}", level);
            self.spec.logging.level = level;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.factory_address().is_zero() {
            anyhow::bail!("spec.factory.address cannot be the zero principal");
        }

        if self.spec.events.capacity == 0 {
            anyhow::bail!("spec.events.capacity must be greater than zero");
        }

        if !matches!(self.spec.logging.format.as_str(), "compact" | "json") {
            anyhow::bail!(
                "Invalid spec.logging.format: '{}'. Must be 'compact' or 'json'",
                self.spec.logging.format
            );
        }

        Ok(())
    }

    /// Configured factory address, or one derived from `metadata.name`.
    pub fn factory_address(&self) -> Principal {
        self.spec
            .factory
            .address
            .unwrap_or_else(|| Principal::from_label(&self.metadata.name))
    }

    /// Registry behaviour stamped onto every bundle this factory deploys.
    pub fn registry_policy(&self) -> RegistryPolicy {
        RegistryPolicy {
            write: self.spec.authorization.write_policy,
            emit_empty_batches: self.spec.events.emit_empty_batches,
        }
    }
}
