//! Byte retrieval for decks and stylesheets.
//!
//! [`Fetcher`] is the narrow HTTP capability the rest of the crate consumes.
//! [`HttpFetcher`] serves `http(s)` through reqwest and `file://` from disk.

use std::io::ErrorKind;

use thiserror::Error;
use url::Url;

use crate::config::FetchSection;
use crate::core::BoxFuture;
use crate::utils::mime;

/// Raw response: status, optional content type, body bytes.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn ok(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.into()),
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8 (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    #[error("unsupported URL scheme `{0}`")]
    Scheme(String),
}

/// Retrieve bytes for a URL.
///
/// Implementations return `Ok` for any HTTP response, including non-2xx;
/// callers decide what a status means.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<FetchResponse, FetchError>>;
}

// =============================================================================
// HttpFetcher
// =============================================================================

/// Default fetcher: reqwest for `http`/`https`, tokio fs for `file`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchSection) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, url: &Url) -> Result<FetchResponse, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await.map_err(transport)?.to_vec();

        Ok(FetchResponse {
            status,
            content_type,
            body,
        })
    }

    async fn fetch_file(url: &Url) -> Result<FetchResponse, FetchError> {
        let Ok(path) = url.to_file_path() else {
            return Ok(FetchResponse::status(404));
        };

        match tokio::fs::read(&path).await {
            Ok(body) => Ok(FetchResponse::ok(mime::from_path(&path), body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FetchResponse::status(404)),
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Ok(FetchResponse::status(403)),
            Err(e) => Err(FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, url: &'a Url) -> BoxFuture<'a, Result<FetchResponse, FetchError>> {
        Box::pin(async move {
            crate::debug!("fetch"; "GET {}", url);
            match url.scheme() {
                "http" | "https" => self.fetch_http(url).await,
                "file" => Self::fetch_file(url).await,
                other => Err(FetchError::Scheme(other.to_string())),
            }
        })
    }
}
