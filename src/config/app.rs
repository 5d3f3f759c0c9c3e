//! Application configuration loading from config.toml
//!
//! The file configures the HTTP listener, the leave cutoff, and optional class and
//! product fixtures that are seeded into an empty database on startup. Every section
//! has defaults, so a missing section (or an empty file) is valid.

use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Guardian-side attendance rules
    #[serde(default)]
    pub attendance: AttendanceConfig,
    /// Classes to create on startup if missing
    #[serde(default)]
    pub classes: Vec<ClassSeed>,
    /// Products to create on startup if missing
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the API binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

/// Guardian-side attendance rules
#[derive(Debug, Deserialize)]
pub struct AttendanceConfig {
    /// Leave must be requested at least this many hours before a session starts
    #[serde(default = "default_leave_cutoff_hours")]
    pub leave_cutoff_hours: i64,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            leave_cutoff_hours: default_leave_cutoff_hours(),
        }
    }
}

const fn default_leave_cutoff_hours() -> i64 {
    24
}

/// A class fixture
#[derive(Debug, Deserialize, Clone)]
pub struct ClassSeed {
    pub id: String,
    pub title: String,
    /// `REGULAR`, `CAMP`, `PRIVATE` or `GROUP`
    #[serde(default = "default_class_type")]
    pub class_type: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub recurrence_rule: Option<String>,
    pub capacity: Option<i32>,
    pub branch_id: Option<String>,
    #[serde(default)]
    pub coach_ids: Vec<String>,
}

fn default_class_type() -> String {
    "REGULAR".to_string()
}

/// A product fixture
#[derive(Debug, Deserialize, Clone)]
pub struct ProductSeed {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Loads the application configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads configuration from `APP_CONFIG`, or `./config.toml`.
///
/// A missing default file yields the built-in defaults; a missing file named
/// explicitly through `APP_CONFIG` is an error.
pub fn load_app_configuration() -> Result<AppConfig> {
    match std::env::var("APP_CONFIG") {
        Ok(path) => load_config(path),
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH),
        Err(_) => {
            tracing::info!("No {DEFAULT_CONFIG_PATH} found, using defaults.");
            Ok(AppConfig::default())
        }
    }
}
