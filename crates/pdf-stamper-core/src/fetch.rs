use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Retrieves the raw bytes behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full body of `url`.
    ///
    /// A non-success HTTP status is an error, as is any transport failure.
    async fn fetch(&self, url: &str) -> Result<Bytes>;
}

/// [`Fetcher`] backed by a shared reqwest client.
///
/// No timeout is applied; a slow server stalls the caller until the
/// underlying connection gives up.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes> {
        debug!("Fetching {}", url);

        let transport = |e: reqwest::Error| Error::FetchTransport {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }
}

/// Best-effort fetch: failures are logged and reported as `None`.
pub async fn fetch_optional(fetcher: &dyn Fetcher, url: &str) -> Option<Bytes> {
    match fetcher.fetch(url).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!("Optional fetch of {} failed: {}", url, e);
            None
        }
    }
}
