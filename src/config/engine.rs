//! Engine configuration with multi-layer merge

use crate::error::RetryPolicy;
use crate::sandbox::{SandboxConfig, SandboxOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level nodeflow configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Script sandbox limits
    #[serde(default)]
    pub sandbox: SandboxSettings,

    /// Retry policy for retryable sub-operations
    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SandboxSettings {
    /// Evaluation timeout in milliseconds
    pub timeout_ms: Option<u64>,

    /// Memory cap in megabytes
    pub memory_limit_mb: Option<usize>,

    /// Max script length in bytes
    pub max_code_length: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySettings {
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub jitter: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Log file path, `~` allowed
    pub file: Option<String>,
}

impl EngineConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/nodeflow/config.toml
    /// 3. .nodeflow/config.toml (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        let project_config_path = project_dir
            .map(|p| p.join(".nodeflow/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".nodeflow/config.toml"));

        if project_config_path.exists() {
            let project_config = Self::load_file(&project_config_path)
                .with_context(|| format!("loading {}", project_config_path.display()))?;
            config.merge(project_config);
        }

        let errors = config.validate();
        if !errors.is_empty() {
            anyhow::bail!("invalid configuration:\n  {}", errors.join("\n  "));
        }

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/nodeflow/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nodeflow/config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        let sandbox = other.sandbox;
        if sandbox.timeout_ms.is_some() {
            self.sandbox.timeout_ms = sandbox.timeout_ms;
        }
        if sandbox.memory_limit_mb.is_some() {
            self.sandbox.memory_limit_mb = sandbox.memory_limit_mb;
        }
        if sandbox.max_code_length.is_some() {
            self.sandbox.max_code_length = sandbox.max_code_length;
        }

        let retry = other.retry;
        if retry.max_retries.is_some() {
            self.retry.max_retries = retry.max_retries;
        }
        if retry.base_delay_ms.is_some() {
            self.retry.base_delay_ms = retry.base_delay_ms;
        }
        if retry.max_delay_ms.is_some() {
            self.retry.max_delay_ms = retry.max_delay_ms;
        }
        if retry.jitter.is_some() {
            self.retry.jitter = retry.jitter;
        }

        if other.logging.file.is_some() {
            self.logging.file = other.logging.file;
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.sandbox.timeout_ms == Some(0) {
            errors.push("sandbox.timeout_ms must be greater than 0".to_string());
        }
        if self.sandbox.memory_limit_mb == Some(0) {
            errors.push("sandbox.memory_limit_mb must be greater than 0".to_string());
        }
        if self.sandbox.max_code_length == Some(0) {
            errors.push("sandbox.max_code_length must be greater than 0".to_string());
        }

        let policy = self.retry_policy();
        if policy.max_delay < policy.base_delay {
            errors.push(format!(
                "retry.max_delay_ms ({}) is smaller than retry.base_delay_ms ({})",
                policy.max_delay.as_millis(),
                policy.base_delay.as_millis()
            ));
        }

        errors
    }

    /// Sandbox configuration with defaults filled in
    pub fn sandbox_config(&self) -> SandboxConfig {
        let mut config = SandboxConfig::default();
        let mut defaults = SandboxOptions::default();
        if let Some(ms) = self.sandbox.timeout_ms {
            defaults.timeout = Duration::from_millis(ms);
        }
        if let Some(mb) = self.sandbox.memory_limit_mb {
            defaults.memory_limit_mb = mb;
        }
        config.defaults = defaults;
        if let Some(max) = self.sandbox.max_code_length {
            config.max_code_length = max;
        }
        config
    }

    /// Retry policy with defaults filled in
    pub fn retry_policy(&self) -> RetryPolicy {
        let mut policy = RetryPolicy::default();
        if let Some(n) = self.retry.max_retries {
            policy.max_retries = n;
        }
        if let Some(ms) = self.retry.base_delay_ms {
            policy.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry.max_delay_ms {
            policy.max_delay = Duration::from_millis(ms);
        }
        if let Some(jitter) = self.retry.jitter {
            policy.jitter = jitter;
        }
        policy
    }

    /// Log file path with `~` expanded
    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging
            .file
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
    }
}
