// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Layers, lowest first: built-in defaults, a TOML file, `MEALBOOK_*`
//! environment variables. Command-line flags are applied on top by the
//! binary.

use crate::store::{Backend, MemoryStore, RestStore};
use crate::types::Session;
use chrono::{Datelike, Local};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the expected shape
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    /// Neither a remote endpoint nor a store file is configured
    #[error("no menu store configured: set endpoint and api_key, or store_file")]
    MissingStore,
    /// The configured store could not be opened
    #[error("failed to open menu store: {0}")]
    Store(#[from] crate::error::StoreError),
    /// The configuration could not be rendered
    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the remote store
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Anonymous access key for the remote store
    #[serde(default)]
    pub api_key: Option<String>,
    /// Bearer token of the signed-in user
    #[serde(default)]
    pub access_token: Option<String>,
    /// Signed-in user id; absent means anonymous
    #[serde(default)]
    pub user_id: Option<String>,
    /// City shown when none is given
    pub city: String,
    /// Year loaded by the search index
    pub search_year: i32,
    /// JSON store file used instead of the remote store
    #[serde(default)]
    pub store_file: Option<PathBuf>,
    /// Remote request timeout in seconds
    pub request_timeout_secs: u64,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            access_token: None,
            user_id: None,
            city: "İstanbul".to_string(),
            search_year: Local::now().year(),
            store_file: None,
            request_timeout_secs: 10,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Identity for the favorite cache
    #[must_use]
    pub fn session(&self) -> Session {
        match &self.user_id {
            Some(user) if !user.is_empty() => Session::authenticated(user.clone()),
            _ => Session::anonymous(),
        }
    }

    /// Copy with credentials masked, for display
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "********".to_string());
        Self {
            api_key: mask(&self.api_key),
            access_token: mask(&self.access_token),
            ..self.clone()
        }
    }

    /// Render as TOML with credentials masked
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }

    /// Open the configured store. A store file wins over the remote endpoint.
    pub fn open_store(&self) -> Result<Backend, ConfigError> {
        if let Some(path) = &self.store_file {
            return Ok(Backend::Memory(MemoryStore::open(path)?));
        }
        match (&self.endpoint, &self.api_key) {
            (Some(endpoint), Some(api_key)) => Ok(Backend::Rest(RestStore::new(
                endpoint,
                api_key,
                self.access_token.as_deref(),
                Duration::from_secs(self.request_timeout_secs),
            )?)),
            _ => Err(ConfigError::MissingStore),
        }
    }
}

/// Default configuration file location
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "hyperpolymath", "mealbook")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration from `path` (required if given), else from the default
/// location if present, then from the environment
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let defaults = Config::default();
    let mut builder = config::Config::builder()
        .set_default("city", defaults.city)?
        .set_default("search_year", i64::from(defaults.search_year))?
        .set_default("request_timeout_secs", defaults.request_timeout_secs)?
        .set_default("log_level", defaults.log_level)?;

    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    } else if let Some(path) = default_path() {
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
    }

    builder = builder.add_source(Environment::with_prefix("MEALBOOK"));
    Ok(builder.build()?.try_deserialize()?)
}
