use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use thiserror::Error;

use crate::config::AppConfig;

#[derive(Error, Debug)]
pub enum OriginError {
    #[error("Origin unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("Origin rejected {url} with status {status}")]
    Rejected { url: String, status: u16 },
}

/// Read-only access to the origin object store.
///
/// One attempt per call; callers that want retries wrap this themselves.
#[async_trait]
pub trait OriginFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, OriginError>;
}

pub struct HttpOriginFetcher {
    client: Client,
}

impl HttpOriginFetcher {
    /// Fails only on an unusable client configuration, which is a startup fault.
    pub fn new(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl OriginFetch for HttpOriginFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, OriginError> {
        debug!("Fetching origin object {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            error!("Origin request for {} failed with status: {}", url, status);
            return Err(OriginError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // A timeout while streaming the body counts as unavailable too
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
