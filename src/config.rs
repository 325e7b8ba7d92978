//! Configuration discovery and loading.
//!
//! Discovery hierarchy:
//! 1. Current directory: ./commitcast.toml or ./.commitcast/config.toml
//! 2. User config: ~/.commitcast/config.toml
//! 3. System config: /etc/commitcast/config.toml
//! 4. Built-in defaults
//!
//! Secrets are environment-only on top of whatever file was found:
//! `GEMINI_API_KEY` for the generation provider and
//! `COMMITCAST_ACCEPTED_TOKENS` (comma separated) for the bearer gate.

use crate::generation::GenerationConfig;
use crate::ratelimit::RateLimitConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOCAL_CONFIG_DIR: &str = ".commitcast";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceControlConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for SourceControlConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com/".to_string(),
            timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    /// Development mode surfaces raw upstream messages in error bodies.
    pub development_mode: bool,
    /// Bearer tokens admitted by the built-in authenticator; empty means any
    /// non-empty bearer is accepted.
    pub accepted_tokens: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub source_control: SourceControlConfig,
    pub generation: GenerationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            development_mode: false,
            accepted_tokens: Vec::new(),
            rate_limit: RateLimitConfig::default(),
            source_control: SourceControlConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Discover a config file using the hierarchy, falling back to defaults.
    pub fn discover() -> Result<Self> {
        if let Some(path) = find_config_file() {
            info!(path = %path.display(), "loading configuration");
            return Self::from_toml_file(path);
        }

        info!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Apply environment overrides on top of file/default values.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std_env::var("GEMINI_API_KEY")
            && !key.is_empty()
        {
            self.generation.api_key = Some(key);
        }
        if let Ok(tokens) = std_env::var("COMMITCAST_ACCEPTED_TOKENS") {
            self.accepted_tokens = tokens
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Ok(addr) = std_env::var("COMMITCAST_BIND_ADDR")
            && !addr.is_empty()
        {
            self.bind_addr = addr;
        }
        if std_env::var("COMMITCAST_DEV_MODE").is_ok_and(|v| v == "1" || v == "true") {
            self.development_mode = true;
        }
    }
}

fn find_config_file() -> Option<PathBuf> {
    for candidate in config_candidates() {
        debug!(path = %candidate.display(), "checking for config file");
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn config_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(current_dir) = std_env::current_dir() {
        candidates.push(current_dir.join("commitcast.toml"));
        candidates.push(current_dir.join(LOCAL_CONFIG_DIR).join(CONFIG_FILE_NAME));
    }

    if let Some(home) = std_env::var_os("HOME") {
        candidates.push(
            PathBuf::from(home)
                .join(LOCAL_CONFIG_DIR)
                .join(CONFIG_FILE_NAME),
        );
    }

    #[cfg(unix)]
    candidates.push(PathBuf::from("/etc/commitcast").join(CONFIG_FILE_NAME));

    candidates
}
