//! Token provider implementation
//!
//! Obtains a bearer token from the token endpoint. One call, no retries at
//! this layer: callers decide when a fresh credential is needed.

use super::types::{Credential, TokenRequest};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

/// Source of bearer credentials
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a fresh credential
    async fn authenticate(&self) -> Result<Credential>;
}

/// Token provider backed by an HTTP token endpoint
#[derive(Debug, Clone)]
pub struct HttpTokenProvider {
    request: TokenRequest,
    client: HttpClient,
}

impl HttpTokenProvider {
    /// Create a provider for the given request
    pub fn new(request: TokenRequest, client: HttpClient) -> Self {
        Self { request, client }
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn authenticate(&self) -> Result<Credential> {
        let request = &self.request;
        let authorization = request.basic.header_value();

        let response = self
            .client
            .send(|client| {
                client
                    .post(&request.url)
                    .header(AUTHORIZATION, &authorization)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(request.payload.clone())
            })
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Token request failed with status {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Token response is not valid JSON: {e}")))?;

        let token = extract_jsonpath(&body, &request.token_field)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::auth(format!(
                    "Token response has no '{}' field",
                    request.token_field
                ))
            })?;

        Ok(Credential::new(token))
    }
}

/// Extract a scalar from JSON using a simple JSONPath expression
/// Supports basic paths like "$.data.token" or "data.token"
pub fn extract_jsonpath(value: &Value, path: &str) -> Option<String> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }

    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
