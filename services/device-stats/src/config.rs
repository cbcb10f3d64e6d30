//! Configuration types for the device statistics service

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// API surface configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Path prefix all resource routes are nested under
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Upper bound for the `limit` query parameter of listing endpoints
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_prefix() -> String {
    "/api/v1".to_string()
}

fn default_max_page_size() -> usize {
    100
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::StatsError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Reject values the router cannot be built from
    pub fn validate(&self) -> crate::Result<()> {
        if !self.api.prefix.is_empty() && !self.api.prefix.starts_with('/') {
            return Err(crate::StatsError::Config(format!(
                "API prefix must start with '/': {}",
                self.api.prefix
            )));
        }
        if self.api.prefix.len() > 1 && self.api.prefix.ends_with('/') {
            return Err(crate::StatsError::Config(format!(
                "API prefix must not end with '/': {}",
                self.api.prefix
            )));
        }
        if self.api.max_page_size == 0 {
            return Err(crate::StatsError::Config(
                "max_page_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
