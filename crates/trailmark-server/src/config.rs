use anyhow::Result;
use std::path::PathBuf;

/// Deployment environment tag; affects the default log verbosity only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// Cross-origin request policy parsed from `ALLOWED_ORIGINS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub public_base_url: String,
    pub allowed_origins: AllowedOrigins,
    pub env: Environment,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("TRAILMARK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("TRAILMARK_PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()?;
        let db_path: PathBuf = std::env::var("TRAILMARK_DB_PATH")
            .unwrap_or_else(|_| "trailmark.db".into())
            .into();
        let storage_dir: PathBuf = std::env::var("TRAILMARK_STORAGE_DIR")
            .unwrap_or_else(|_| "./object-storage".into())
            .into();
        let public_base_url = std::env::var("TRAILMARK_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"));

        let allowed_origins = parse_origins(
            &std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".into()),
        );

        let env = match std::env::var("TRAILMARK_ENV").as_deref() {
            Ok("production") => Environment::Production,
            _ => Environment::Development,
        };

        Ok(Self {
            host,
            port,
            db_path,
            storage_dir,
            public_base_url,
            allowed_origins,
            env,
        })
    }

    pub fn default_log_filter(&self) -> &'static str {
        match self.env {
            Environment::Development => "trailmark=debug,tower_http=debug",
            Environment::Production => "trailmark=info,tower_http=info",
        }
    }
}

/// `*` means any origin; otherwise a comma-separated list.
fn parse_origins(raw: &str) -> AllowedOrigins {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "*" {
        return AllowedOrigins::Any;
    }
    let origins: Vec<String> = trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if origins.is_empty() {
        AllowedOrigins::Any
    } else {
        AllowedOrigins::List(origins)
    }
}
