use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::Config;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::renderer::{MjmlRenderer, Renderer};

/// Shared by every request. Nothing in here is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<dyn Fetcher>,
    pub renderer: Arc<dyn Renderer>,
    pub port: u16,
    pub environment: Arc<str>,
}

impl AppState {
    pub fn new(config: &Config, fetcher: Arc<dyn Fetcher>, renderer: Arc<dyn Renderer>) -> Self {
        AppState {
            fetcher,
            renderer,
            port: config.port,
            environment: Arc::from(config.environment.as_str()),
        }
    }
}

/// Builds the production pipeline: reqwest fetcher plus mrml renderer.
pub fn initialize_state(config: &Config) -> anyhow::Result<AppState> {
    let fetcher = HttpFetcher::new(config.fetch_timeout()).context("Failed to build HTTP client")?;
    let renderer = MjmlRenderer::new(config.validation_level);

    info!(
        timeout_secs = config.fetch_timeout_secs,
        level = ?config.validation_level,
        "conversion pipeline ready"
    );

    Ok(AppState::new(config, Arc::new(fetcher), Arc::new(renderer)))
}
