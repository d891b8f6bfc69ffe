//! Configuration management for nimage.
//!
//! Configuration comes from two places:
//! - Command-line arguments via clap (where the config file lives, verbosity)
//! - A JSON document read once at startup ([`ServiceConfig`])
//!
//! # Example config.json
//!
//! ```json
//! {
//!   "quality": 80,
//!   "cacheFolder": "/var/cache/nimage",
//!   "cacheClearKey": "change-me",
//!   "port": "8080",
//!   "debug": false
//! }
//! ```
//!
//! Optional keys: `host` (default `0.0.0.0`), `sourceRoot` (default `/`),
//! `cacheMaxAge` (default 3600) and `corsOrigins` (default: any origin).
//!
//! The parsed [`ServiceConfig`] is never mutated after startup; components
//! receive the values they need when they are constructed.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::codec::{DEFAULT_QUALITY, MAX_QUALITY};

// =============================================================================
// Default Values
// =============================================================================

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default source root. Request paths are absolute filesystem paths.
pub const DEFAULT_SOURCE_ROOT: &str = "/";

/// Default HTTP cache max-age in seconds (1 hour).
pub const DEFAULT_CACHE_MAX_AGE: u32 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// nimage - serve JPEG/PNG images as cached WebP.
#[derive(Parser, Debug, Clone)]
#[command(name = "nimage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, env = "NIMAGE_CONFIG")]
    pub config: PathBuf,

    /// Enable verbose logging (debug level) regardless of the config file.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Service Configuration
// =============================================================================

/// Errors loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Process-wide service configuration.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    /// WebP quality (0-100).
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Root directory for cached artifacts.
    pub cache_folder: PathBuf,

    /// Secret required by `/clearcache`.
    pub cache_clear_key: String,

    /// Port to listen on.
    pub port: String,

    /// Enable debug logging and request tracing.
    #[serde(default)]
    pub debug: bool,

    /// Host address to bind the server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Directory request paths are resolved against.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// HTTP Cache-Control max-age in seconds.
    #[serde(default = "default_cache_max_age")]
    pub cache_max_age: u32,

    /// Allowed CORS origins. None allows any origin.
    #[serde(default)]
    pub cors_origins: Option<Vec<String>>,
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_source_root() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE_ROOT)
}

fn default_cache_max_age() -> u32 {
    DEFAULT_CACHE_MAX_AGE
}

impl ServiceConfig {
    /// Read and parse a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Self::from_json(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse a configuration document.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.quality > MAX_QUALITY {
            return Err(format!("quality must be between 0 and {}", MAX_QUALITY));
        }

        if self.cache_folder.as_os_str().is_empty() {
            return Err("cacheFolder is required".to_string());
        }

        // An empty key would let a bare /clearcache wipe the cache
        if self.cache_clear_key.is_empty() {
            return Err("cacheClearKey must not be empty".to_string());
        }

        if self.port_number().is_none() {
            return Err(format!("port must be a number between 1 and 65535, got '{}'", self.port));
        }

        Ok(())
    }

    /// Parsed listen port, if valid.
    pub fn port_number(&self) -> Option<u16> {
        self.port.trim().parse().ok().filter(|p| *p != 0)
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port.trim())
    }
}

// =============================================================================
// Tests
// =============================================================================
