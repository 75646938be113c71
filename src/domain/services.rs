//! Page renderer boundary
//!
//! The extraction core never touches the network. It receives rendered
//! markup from a [`PageRenderer`]; timeouts and cancellation are owned by
//! the caller through the token passed to every render call.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Render of {url} was cancelled")]
    Cancelled { url: String },

    #[error("Render of {url} timed out after {timeout_seconds}s")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("HTTP request failed: {status} - {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("No markup available for {url}")]
    NotFound { url: String },

    #[error("Renderer configuration error: {message}")]
    Configuration { message: String },
}

impl RenderError {
    /// Worth retrying by the caller
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::Cancelled { .. } | Self::NotFound { .. } | Self::Configuration { .. } => false,
        }
    }
}

/// Supplies the rendered markup snapshot for a URL
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, cancel: &CancellationToken) -> Result<String, RenderError>;
}
