use std::{error::Error as _, time::Duration};

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT},
    Client, StatusCode,
};
use thiserror::Error;
use tracing::{debug, error};

/// Identifies the service to upstream hosts.
pub const USER_AGENT: &str = concat!("MJML-Converter/", env!("CARGO_PKG_VERSION"));

const ACCEPT_ANY: &str = "application/json, text/plain, */*";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {}s", .timeout.as_secs_f32())]
    Timeout { url: String, timeout: Duration },

    #[error("{url} responded with status {status}")]
    Status { url: String, status: StatusCode },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned a body that is not valid UTF-8: {source}")]
    Decode {
        url: String,
        source: std::string::FromUtf8Error,
    },
}

/// Retrieves the raw document behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Single-attempt GET over a shared, preconfigured client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_ANY));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, timeout })
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            return FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            };
        }

        // reqwest keeps the useful part (refused, dns, tls) in the source chain
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        FetchError::Transport {
            url: url.to_string(),
            message,
        }
    }

    async fn get(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        // bytes as received; no charset transcoding
        let body = response.bytes().await.map_err(|e| self.classify(url, e))?;
        String::from_utf8(body.to_vec()).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let result = self.get(url).await;

        match &result {
            Ok(body) => debug!(url, bytes = body.len(), "fetched MJML document"),
            Err(e) => error!(url, error = %e, "Error fetching MJML content"),
        }
        result
    }
}
