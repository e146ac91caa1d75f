//! TOML configuration.
//!
//! Only `[backend].base_url` is required; every other key has a default.
//!
//! ```toml
//! [backend]
//! base_url = "https://content.example.com"
//! api_key_env = "RELAY_API_KEY"
//! timeout_secs = 30
//!
//! [server]
//! bind = "127.0.0.1:7341"
//! read_only = false
//!
//! [retrieval]
//! default_limit = 10
//! max_limit = 50
//! max_sources = 10
//!
//! [frameworks]
//! min_confidence = 0.6
//! limit = 10
//!
//! [budget]
//! single_item_threshold = 10000
//! batch_threshold = 50000
//! preview_chars = 500
//! ```

use anyhow::{Context, Result};
use content_relay_core::budget::{
    BudgetGate, DEFAULT_BATCH_THRESHOLD, DEFAULT_PREVIEW_CHARS, DEFAULT_SINGLE_ITEM_THRESHOLD,
};
use content_relay_core::frameworks::MAX_CONFIDENCE;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub frameworks: FrameworksConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Inline key; the environment variable wins when both are set.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "RELAY_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl BackendConfig {
    /// Resolve the bearer credential from the environment or the inline key.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Reject mutating tools before any network call.
    #[serde(default)]
    pub read_only: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            read_only: false,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            max_sources: default_max_sources(),
        }
    }
}

fn default_limit() -> usize {
    10
}
fn default_max_limit() -> usize {
    50
}
fn default_max_sources() -> usize {
    10
}

impl RetrievalConfig {
    /// Apply the configured default and ceiling to a caller-supplied limit.
    pub fn clamp_limit(&self, requested: Option<u64>) -> usize {
        requested
            .map(|n| n as usize)
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FrameworksConfig {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_framework_limit")]
    pub limit: usize,
}

impl Default for FrameworksConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            limit: default_framework_limit(),
        }
    }
}

fn default_min_confidence() -> f64 {
    0.6
}
fn default_framework_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct BudgetConfig {
    #[serde(default = "default_single_item_threshold")]
    pub single_item_threshold: u64,
    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: u64,
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            single_item_threshold: default_single_item_threshold(),
            batch_threshold: default_batch_threshold(),
            preview_chars: default_preview_chars(),
        }
    }
}

fn default_single_item_threshold() -> u64 {
    DEFAULT_SINGLE_ITEM_THRESHOLD
}
fn default_batch_threshold() -> u64 {
    DEFAULT_BATCH_THRESHOLD
}
fn default_preview_chars() -> usize {
    DEFAULT_PREVIEW_CHARS
}

impl BudgetConfig {
    pub fn single_item_gate(&self) -> BudgetGate {
        BudgetGate {
            threshold: self.single_item_threshold,
            preview_chars: self.preview_chars,
        }
    }

    pub fn batch_gate(&self) -> BudgetGate {
        BudgetGate {
            threshold: self.batch_threshold,
            preview_chars: self.preview_chars,
        }
    }
}

impl Config {
    /// Config pointing at `base_url` with every other value defaulted.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig {
                base_url: base_url.into(),
                api_key_env: default_api_key_env(),
                api_key: None,
                timeout_secs: default_timeout_secs(),
            },
            server: ServerConfig::default(),
            retrieval: RetrievalConfig::default(),
            frameworks: FrameworksConfig::default(),
            budget: BudgetConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let url = config.backend.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("backend.base_url must start with http:// or https://");
    }
    if config.backend.timeout_secs == 0 {
        anyhow::bail!("backend.timeout_secs must be >= 1");
    }

    let r = &config.retrieval;
    if r.default_limit < 1 || r.max_limit < 1 || r.max_sources < 1 {
        anyhow::bail!("retrieval limits must be >= 1");
    }
    if r.default_limit > r.max_limit {
        anyhow::bail!(
            "retrieval.default_limit ({}) must not exceed retrieval.max_limit ({})",
            r.default_limit,
            r.max_limit
        );
    }

    if !(0.0..=MAX_CONFIDENCE).contains(&config.frameworks.min_confidence) {
        anyhow::bail!("frameworks.min_confidence must be in [0.0, {}]", MAX_CONFIDENCE);
    }
    if config.frameworks.limit < 1 {
        anyhow::bail!("frameworks.limit must be >= 1");
    }

    let b = &config.budget;
    if b.single_item_threshold == 0 || b.batch_threshold == 0 {
        anyhow::bail!("budget thresholds must be > 0");
    }

    Ok(())
}
