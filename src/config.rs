//! Service configuration loaded from the environment (and `.env`).

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub templates_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub typst_bin: PathBuf,
    pub max_upload_bytes: usize,
    pub render_concurrency: usize,
    pub generation_timeout: Duration,
    /// Empty means any origin is allowed.
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let templates_dir = default_templates_dir();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            fonts_dir: templates_dir.join("fonts"),
            templates_dir,
            typst_bin: PathBuf::from("typst"),
            max_upload_bytes: 2 * 1024 * 1024,
            render_concurrency: 4,
            generation_timeout: Duration::from_secs(120),
            allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let templates_dir = var("TEMPLATES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.templates_dir);
        let fonts_dir = var("FONTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| templates_dir.join("fonts"));

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", var("PORT"), defaults.port)?,
            templates_dir,
            fonts_dir,
            typst_bin: var("TYPST_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.typst_bin),
            max_upload_bytes: parse_var(
                "MAX_UPLOAD_BYTES",
                var("MAX_UPLOAD_BYTES"),
                defaults.max_upload_bytes,
            )?,
            render_concurrency: parse_var(
                "RENDER_CONCURRENCY",
                var("RENDER_CONCURRENCY"),
                defaults.render_concurrency,
            )?
            .max(1),
            generation_timeout: Duration::from_secs(parse_var(
                "GENERATION_TIMEOUT_SECS",
                var("GENERATION_TIMEOUT_SECS"),
                defaults.generation_timeout.as_secs(),
            )?),
            allowed_origins: var("ALLOWED_ORIGINS")
                .map(|value| {
                    value
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn default_templates_dir() -> PathBuf {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static")).to_path_buf()
}

fn parse_var<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}
