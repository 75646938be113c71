//! HTTP page renderer
//!
//! Fetches storefront pages with a browser-like identity and hands the
//! markup to the extractors. Every request races the caller's
//! cancellation token; the timeout comes from [`RendererConfig`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::services::{PageRenderer, RenderError};
use crate::infrastructure::config::RendererConfig;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

pub struct HttpClient {
    client: Client,
    config: RendererConfig,
}

impl HttpClient {
    pub fn new(config: RendererConfig) -> Result<Self, RenderError> {
        let header = |value: &str, name: &str| {
            HeaderValue::from_str(value).map_err(|e| RenderError::Configuration {
                message: format!("Invalid {name} header: {e}"),
            })
        };

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header(&config.user_agent, "user agent")?);
        headers.insert(ACCEPT_LANGUAGE, header(&config.accept_language, "accept-language")?);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .map_err(|e| RenderError::Configuration {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn classify(&self, url: &str, error: reqwest::Error) -> RenderError {
        if error.is_timeout() {
            RenderError::Timeout {
                url: url.to_string(),
                timeout_seconds: self.config.timeout_seconds,
            }
        } else {
            RenderError::Transport {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

#[async_trait]
impl PageRenderer for HttpClient {
    async fn render(&self, url: &str, cancel: &CancellationToken) -> Result<String, RenderError> {
        let cancelled = || RenderError::Cancelled { url: url.to_string() };
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        info!("Fetching {}", url);

        let response = tokio::select! {
            result = self.client.get(url).send() => result.map_err(|e| self.classify(url, e))?,
            () = cancel.cancelled() => {
                warn!("HTTP request cancelled for {}", url);
                return Err(cancelled());
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = tokio::select! {
            result = response.text() => result.map_err(|e| self.classify(url, e))?,
            () = cancel.cancelled() => {
                warn!("Response reading cancelled for {}", url);
                return Err(cancelled());
            }
        };

        debug!("Fetched {} ({} chars)", url, text.len());
        Ok(text)
    }
}
