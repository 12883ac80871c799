// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Platform Configuration Types
//
// Defines the configuration schema for an Atrium platform process:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Logging settings consumed by infrastructure::logging
// - Event bus sizing
// - Workflow defaults and the publication approval policy

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "atrium.io/v1";
pub const KIND: &str = "PlatformConfig";

/// Top-level Kubernetes-style platform configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfigManifest {
    /// API version (must be "atrium.io/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "PlatformConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: PlatformConfigSpec,
}

/// Manifest metadata (Kubernetes-style)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Deployment name, shown in logs
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

/// Content under spec:
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfigSpec {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub event_bus: EventBusConfig,

    #[serde(default)]
    pub workflow: WorkflowDefaults,

    #[serde(default)]
    pub publishing: PublishingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (e.g. "info", "atrium_core=debug")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBusConfig {
    /// Broadcast channel capacity; slow subscribers lag past this many events
    #[serde(default = "default_event_bus_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefaults {
    /// Workflow type used when a caller does not name one
    #[serde(default = "default_workflow_type")]
    pub default_workflow_type: String,
}

/// Approval policy applied before a completed workflow publishes its content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishingConfig {
    /// Levels that each need a standing approval (e.g. ["L1", "L2"])
    #[serde(default = "default_required_levels")]
    pub required_levels: Vec<String>,

    /// `final_status` that marks a completed workflow as approved
    #[serde(default = "default_approved_status")]
    pub approved_status: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_event_bus_capacity() -> usize {
    1000
}

fn default_workflow_type() -> String {
    "ContentPublishing".to_string()
}

fn default_required_levels() -> Vec<String> {
    vec!["L1".to_string()]
}

fn default_approved_status() -> String {
    "Approved".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_bus_capacity(),
        }
    }
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            default_workflow_type: default_workflow_type(),
        }
    }
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            required_levels: default_required_levels(),
            approved_status: default_approved_status(),
        }
    }
}

impl Default for PlatformConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "atrium".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: PlatformConfigSpec::default(),
        }
    }
}

impl PlatformConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(path, yaml).with_context(|| format!("Failed to write config file {:?}", path))?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse config")
    }

    /// Discover configuration file using precedence order
    /// 1. ATRIUM_CONFIG_PATH environment variable
    /// 2. ./atrium-config.yaml (working directory)
    /// 3. ~/.atrium/config.yaml (user home)
    /// 4. /etc/atrium/config.yaml (system, Unix) or C:\ProgramData\Atrium\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ATRIUM_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./atrium-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".atrium").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/atrium/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Atrium\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default.
    ///
    /// Environment overrides are applied before validation.
    pub fn load_or_default(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            // An explicit path must exist and parse
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path)
                .with_context(|| format!("Failed to load config at {:?}", path))?
        } else if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            Self::from_yaml_file(&config_path)
                .with_context(|| format!("Failed to load discovered config at {:?}", config_path))?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate().context("Invalid platform configuration")?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("ATRIUM_LOG_LEVEL") {
            tracing::info!("Environment override: ATRIUM_LOG_LEVEL={}", level);
            self.spec.logging.level = level;
        }

        if let Some(format) = lookup("ATRIUM_LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "json" | "text" => {
                    tracing::info!("Environment override: ATRIUM_LOG_FORMAT={}", format);
                    self.spec.logging.format = format.to_lowercase();
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for ATRIUM_LOG_FORMAT: '{}'. Expected json/text. Ignoring.",
                        format
                    );
                }
            }
        }

        if let Some(val) = lookup("ATRIUM_EVENT_BUS_CAPACITY") {
            match val.parse::<usize>() {
                Ok(capacity) if capacity > 0 => {
                    tracing::info!("Environment override: ATRIUM_EVENT_BUS_CAPACITY={}", capacity);
                    self.spec.event_bus.capacity = capacity;
                }
                _ => {
                    tracing::warn!(
                        "Invalid value for ATRIUM_EVENT_BUS_CAPACITY: '{}'. Expected a positive integer. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
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

        if self.metadata.name.trim().is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if !matches!(self.spec.logging.format.as_str(), "json" | "text") {
            anyhow::bail!(
                "spec.logging.format must be 'json' or 'text', got '{}'",
                self.spec.logging.format
            );
        }

        if self.spec.event_bus.capacity == 0 {
            anyhow::bail!("spec.event_bus.capacity must be greater than zero");
        }

        if self.spec.workflow.default_workflow_type.trim().is_empty() {
            anyhow::bail!("spec.workflow.default_workflow_type cannot be empty");
        }

        if self.spec.publishing.approved_status.trim().is_empty() {
            anyhow::bail!("spec.publishing.approved_status cannot be empty");
        }

        for level in &self.spec.publishing.required_levels {
            if level.trim().is_empty() {
                anyhow::bail!("spec.publishing.required_levels cannot contain an empty level");
            }
        }

        Ok(())
    }
}
