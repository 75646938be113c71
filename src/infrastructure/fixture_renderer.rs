//! In-memory page renderer
//!
//! Serves pre-captured markup by URL, for tests and offline replays of
//! saved storefront pages.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::services::{PageRenderer, RenderError};

#[derive(Default)]
pub struct FixtureRenderer {
    pages: RwLock<HashMap<String, String>>,
}

impl FixtureRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: impl Into<String>, markup: impl Into<String>) -> Self {
        self.insert(url, markup);
        self
    }

    pub fn insert(&self, url: impl Into<String>, markup: impl Into<String>) {
        self.pages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), markup.into());
    }

    /// Register a saved HTML file under `url`
    pub async fn insert_file(&self, url: impl Into<String>, path: impl AsRef<Path>) -> std::io::Result<()> {
        let markup = tokio::fs::read_to_string(path).await?;
        self.insert(url, markup);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pages.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PageRenderer for FixtureRenderer {
    async fn render(&self, url: &str, cancel: &CancellationToken) -> Result<String, RenderError> {
        if cancel.is_cancelled() {
            return Err(RenderError::Cancelled { url: url.to_string() });
        }

        let page = self
            .pages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned();

        match page {
            Some(markup) => {
                debug!("Serving fixture for {} ({} chars)", url, markup.len());
                Ok(markup)
            }
            None => Err(RenderError::NotFound { url: url.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_registered_pages_only() {
        let renderer = FixtureRenderer::new().with_page("https://btech.com/en/s?q=x", "<html></html>");
        let cancel = CancellationToken::new();

        assert_eq!(renderer.render("https://btech.com/en/s?q=x", &cancel).await.unwrap(), "<html></html>");
        assert!(matches!(
            renderer.render("https://btech.com/other", &cancel).await,
            Err(RenderError::NotFound { .. })
        ));

        cancel.cancel();
        assert!(matches!(
            renderer.render("https://btech.com/en/s?q=x", &cancel).await,
            Err(RenderError::Cancelled { .. })
        ));
    }
}
