//! TOML configuration for the `hm` binary and HTTP server.
//!
//! Only `[db]` is required. Every other section falls back to the defaults
//! exported by `household-memory-core`, so a two-line file is a valid
//! config. [`load_config`] parses and validates; [`Config::pipeline`] turns
//! the file into the core's [`PipelineConfig`].

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use household_memory_core::evidence::{
    EvidenceThresholds, DEFAULT_HIGH_THRESHOLD, DEFAULT_MULTI_THRESHOLD,
    DEFAULT_SECOND_THRESHOLD,
};
use household_memory_core::expand::{
    ExpansionSettings, DEFAULT_EXPANSION_TIMEOUT, DEFAULT_MAX_EXPANSIONS,
};
use household_memory_core::pipeline::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
use household_memory_core::PipelineConfig;

pub const DEFAULT_BIND: &str = "127.0.0.1:8088";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub evidence: EvidenceConfig,
    #[serde(default)]
    pub expansion: ExpansionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
        }
    }
}

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

#[derive(Debug, Deserialize, Clone)]
pub struct EvidenceConfig {
    #[serde(default = "default_high_threshold")]
    pub high_threshold: f64,
    #[serde(default = "default_multi_threshold")]
    pub multi_threshold: f64,
    #[serde(default = "default_second_threshold")]
    pub second_threshold: f64,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            high_threshold: DEFAULT_HIGH_THRESHOLD,
            multi_threshold: DEFAULT_MULTI_THRESHOLD,
            second_threshold: DEFAULT_SECOND_THRESHOLD,
        }
    }
}

fn default_high_threshold() -> f64 {
    DEFAULT_HIGH_THRESHOLD
}
fn default_multi_threshold() -> f64 {
    DEFAULT_MULTI_THRESHOLD
}
fn default_second_threshold() -> f64 {
    DEFAULT_SECOND_THRESHOLD
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExpansionConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_expansions")]
    pub max_expansions: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            max_expansions: default_max_expansions(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_max_expansions() -> usize {
    DEFAULT_MAX_EXPANSIONS
}
fn default_timeout_ms() -> u64 {
    DEFAULT_EXPANSION_TIMEOUT.as_millis() as u64
}

impl ExpansionConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled" && self.max_expansions > 0
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

impl Config {
    /// A config with every default and the given database path.
    pub fn minimal(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
            },
            retrieval: RetrievalConfig::default(),
            evidence: EvidenceConfig::default(),
            expansion: ExpansionConfig::default(),
            server: ServerConfig::default(),
        }
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            search_limit: self.retrieval.limit,
            evidence: EvidenceThresholds {
                high: self.evidence.high_threshold,
                multi: self.evidence.multi_threshold,
                second: self.evidence.second_threshold,
            },
            expansion: ExpansionSettings {
                max_expansions: self.expansion.max_expansions,
                timeout: Duration::from_millis(self.expansion.timeout_ms),
            },
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
    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    if config.retrieval.limit == 0 || config.retrieval.limit > MAX_SEARCH_LIMIT {
        anyhow::bail!("retrieval.limit must be between 1 and {}", MAX_SEARCH_LIMIT);
    }

    if config.expansion.timeout_ms == 0 {
        anyhow::bail!("expansion.timeout_ms must be > 0");
    }

    match config.expansion.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown expansion provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    if config.expansion.is_enabled() && config.expansion.model.is_none() {
        anyhow::bail!(
            "expansion.model must be specified when provider is '{}'",
            config.expansion.provider
        );
    }

    // Threshold ranges are owned by the core.
    config.pipeline().validate()?;

    Ok(())
}
