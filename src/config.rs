// src/config.rs

use std::env;
use std::path::PathBuf;

use crate::error::{AppError, Result};

/// Brent crude (FOB) daily price series published by IPEA.
pub const DEFAULT_SOURCE_URL: &str =
    "http://www.ipeadata.gov.br/ExibeSerie.aspx?module=m&serid=1650971490&oper=view";
pub const DEFAULT_CACHE_PATH: &str = "raw_data.csv";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub source_url: String,
    pub cache_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            source_url: DEFAULT_SOURCE_URL.to_string(),
            cache_path: PathBuf::from(DEFAULT_CACHE_PATH),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    /// Reads the process environment; `main` loads `.env` into it beforehand.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();

        let port = match lookup("BRENT_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| AppError::Config(format!("BRENT_PORT '{}': {}", raw, e)))?,
            None => defaults.port,
        };

        let source_url = lookup("BRENT_SOURCE_URL").unwrap_or(defaults.source_url);
        if source_url.trim().is_empty() {
            return Err(AppError::Config("BRENT_SOURCE_URL is empty".into()));
        }

        Ok(Settings {
            source_url,
            cache_path: lookup("BRENT_CACHE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            host: lookup("BRENT_HOST").unwrap_or(defaults.host),
            port,
        })
    }
}
