pub mod rewrite;

use std::sync::Arc;

use log::info;
use thiserror::Error;

use crate::config::{is_object_segment, AppConfig};
use crate::origin::{OriginError, OriginFetch};

pub use rewrite::ImageTagRewriter;

/// First path segments owned by fixed routes. They never name a user.
pub const RESERVED_SEGMENTS: &[&str] = &["health", "sitemap.xml", "image-proxy", "cache-list"];

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Page not found: {0}")]
    NotFound(String),

    #[error("Origin error: {0}")]
    Origin(#[from] OriginError),
}

pub fn is_reserved_segment(segment: &str) -> bool {
    RESERVED_SEGMENTS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(segment))
}

// HTML documents are never cached, every request goes back to the origin
pub struct PageProxy {
    fetcher: Arc<dyn OriginFetch>,
    config: AppConfig,
    rewriter: ImageTagRewriter,
}

impl PageProxy {
    pub fn new(fetcher: Arc<dyn OriginFetch>, config: AppConfig) -> Self {
        let rewriter = ImageTagRewriter::new(&config.image_origin_root, &config.public_host);
        Self {
            fetcher,
            config,
            rewriter,
        }
    }

    pub async fn get_rewritten_document(&self, user_id: &str, file_id: &str) -> Result<Vec<u8>, PageError> {
        // The router ranks fixed paths first, but `/image-proxy/a/b` still lands here
        if is_reserved_segment(user_id)
            || !is_object_segment(user_id)
            || !file_id.split('/').all(is_object_segment)
        {
            return Err(PageError::NotFound(format!("{}/{}", user_id, file_id)));
        }

        let url = self.config.html_url(user_id, file_id);
        let document = self.fetcher.fetch(&url).await?;

        let (rewritten, replaced) = self.rewriter.rewrite(&document);
        info!(
            "Served {}/{} ({} bytes, {} image tags rewritten)",
            user_id,
            file_id,
            rewritten.len(),
            replaced
        );

        Ok(rewritten)
    }

    pub async fn get_sitemap(&self) -> Result<Vec<u8>, PageError> {
        Ok(self.fetcher.fetch(&self.config.sitemap_url).await?)
    }
}
