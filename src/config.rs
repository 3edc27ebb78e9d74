//! Service configuration.
//!
//! Every option can be passed as a flag or through its environment variable.
//! The resulting [`Config`] is built once in `main` and handed to the state
//! and router constructors; nothing reads the environment after startup.

use std::{net::SocketAddr, time::Duration};

use axum::http::HeaderValue;
use clap::{Parser, ValueEnum};

/// How strictly the converter treats structural problems in the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValidationLevel {
    /// Render anyway and report problems as warnings.
    Soft,
    /// Refuse to render when any warning is produced.
    Strict,
    /// Render without collecting warnings.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "mjml-converter", version, about = "Fetches MJML from a URL and converts it to HTML")]
pub struct Config {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Environment name reported by `GET /status`.
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub environment: String,

    /// The single origin allowed to call the API from a browser.
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:4200")]
    pub allowed_origin: String,

    /// Upper bound for fetching the remote document, in seconds.
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    #[arg(long, env = "MJML_VALIDATION_LEVEL", value_enum, default_value_t = ValidationLevel::Soft)]
    pub validation_level: ValidationLevel,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    /// Checks the values clap cannot check on its own.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.fetch_timeout_secs == 0 {
            anyhow::bail!("FETCH_TIMEOUT_SECS must be greater than 0");
        }

        if HeaderValue::from_str(&self.allowed_origin).is_err() {
            anyhow::bail!(
                "CORS_ORIGIN must be a valid header value, got '{}'",
                self.allowed_origin
            );
        }

        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address '{}': {}", addr, e))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}:{}", self.host, self.port);
        tracing::info!("  Environment: {}", self.environment);
        tracing::info!("  Allowed origin: {}", self.allowed_origin);
        tracing::info!("  Fetch timeout: {}s", self.fetch_timeout_secs);
        tracing::info!("  Validation level: {:?}", self.validation_level);
    }
}
