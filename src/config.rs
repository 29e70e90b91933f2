//! Environment configuration, read once at startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context};

use crate::api::DEFAULT_CONCURRENCY_LIMIT;
use crate::service::DEFAULT_MAX_DIMENSION;

const SERVER_HOST: &str = "0.0.0.0";
const SERVER_PORT: u16 = 8080;
const STORAGE_PATH: &str = "./data/barcodes";
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    None,
    Memory,
    Local(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("expected compact or json, got {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub max_upload_bytes: usize,
    pub max_dimension: u32,
    pub concurrency_limit: usize,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: SERVER_HOST.to_string(),
            port: SERVER_PORT,
            storage: StorageBackend::None,
            max_upload_bytes: MAX_UPLOAD_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            log_format: LogFormat::Compact,
        }
    }
}

// Parses an optional variable, naming it in the error
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(v) if !v.trim().is_empty() => {
            v.trim().parse().map_err(|e| anyhow!("{e}")).with_context(|| format!("{name} is invalid: {v:?}"))
        }
        _ => Ok(default),
    }
}

impl Config {
    /// Loads `.env` when present, then reads the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let storage = match lookup("STORAGE_BACKEND").unwrap_or_default().trim().to_ascii_lowercase().as_str() {
            "" | "none" => StorageBackend::None,
            "memory" => StorageBackend::Memory,
            "local" => StorageBackend::Local(lookup("STORAGE_PATH").unwrap_or_else(|| STORAGE_PATH.to_string()).into()),
            other => return Err(anyhow!("STORAGE_BACKEND is invalid: expected none, memory or local, got {other:?}")),
        };

        let config = Self {
            host: lookup("SERVER_HOST").filter(|h| !h.trim().is_empty()).unwrap_or(defaults.host),
            port: parse_var(&lookup, "SERVER_PORT", defaults.port)?,
            storage,
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            max_dimension: parse_var(&lookup, "MAX_DIMENSION", defaults.max_dimension)?,
            concurrency_limit: parse_var(&lookup, "HTTP_CONCURRENCY_LIMIT", defaults.concurrency_limit)?,
            log_format: parse_var(&lookup, "LOG_FORMAT", defaults.log_format)?,
        };
        if config.max_dimension == 0 {
            return Err(anyhow!("MAX_DIMENSION must be positive"));
        }
        Ok(config)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
