//! Paginated data endpoint
//!
//! Each call is one `POST` with the same payload; the provider tracks the
//! position server-side, so there is no cursor to send.

use super::client::HttpClient;
use crate::auth::Credential;
use crate::config::ApiConfig;
use crate::decode::{Page, PageDecoder};
use crate::error::{Error, Result};
use crate::types::JsonValue;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

/// Outcome of one page request
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// A decoded page
    Page(Page),
    /// The credential was rejected (`401`)
    Unauthorized,
}

/// Source of pages
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Request the next page with the given credential
    ///
    /// `401` is reported as [`Fetched::Unauthorized`]. Any other non-2xx
    /// status is an [`Error::HttpStatus`].
    async fn fetch(&self, credential: &Credential) -> Result<Fetched>;
}

/// Data endpoint request (after template interpolation)
#[derive(Clone)]
pub struct DataRequest {
    /// Data endpoint URL
    pub url: String,
    /// API key value
    pub api_key: String,
    /// Header carrying the API key
    pub api_key_header: String,
    /// Raw request body
    pub body: String,
}

impl DataRequest {
    /// Create a request with the default `apikey` header
    pub fn new(url: impl Into<String>, api_key: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            api_key_header: "apikey".to_string(),
            body: body.into(),
        }
    }

    /// Build from the `api` config section
    pub fn from_config(api: &ApiConfig) -> Self {
        let body = match &api.payload {
            JsonValue::String(raw) => raw.clone(),
            other => other.to_string(),
        };

        Self {
            url: api.url.clone(),
            api_key: api.api_key.clone(),
            api_key_header: api.api_key_header.clone(),
            body,
        }
    }
}

impl std::fmt::Debug for DataRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataRequest")
            .field("url", &self.url)
            .field("api_key_header", &self.api_key_header)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

/// Page source backed by the HTTP data endpoint
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    request: DataRequest,
    decoder: PageDecoder,
    client: HttpClient,
}

impl HttpPageSource {
    /// Create a page source
    pub fn new(request: DataRequest, decoder: PageDecoder, client: HttpClient) -> Self {
        Self {
            request,
            decoder,
            client,
        }
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self, credential: &Credential) -> Result<Fetched> {
        let request = &self.request;

        let response = self
            .client
            .send(|client| {
                client
                    .post(&request.url)
                    .header(request.api_key_header.as_str(), request.api_key.as_str())
                    .bearer_auth(credential.token())
                    .header(CONTENT_TYPE, "application/json")
                    .body(request.body.clone())
            })
            .await?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Ok(Fetched::Unauthorized);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }

        let body = response.text().await?;
        self.decoder.decode(&body).map(Fetched::Page)
    }
}
