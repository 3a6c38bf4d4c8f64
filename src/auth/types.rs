//! Auth types
//!
//! These types represent the runtime auth configuration after template
//! interpolation has been applied, and the credential it yields.

use crate::config::TokenConfig;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::fmt;

/// Opaque bearer token
///
/// There is no local expiry tracking: a stale credential is discovered
/// when the data endpoint answers `401`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Wrap a token string
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// The raw token, for the `Authorization` header only
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

/// Basic credentials for the token endpoint
#[derive(Clone, PartialEq, Eq)]
pub enum BasicCredentials {
    /// Already base64-encoded `user:password`
    Encoded(String),
    /// Client ID and secret, encoded on use
    Client {
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
    },
}

impl BasicCredentials {
    /// Value for the `Authorization` header
    pub fn header_value(&self) -> String {
        match self {
            BasicCredentials::Encoded(encoded) => format!("Basic {encoded}"),
            BasicCredentials::Client {
                client_id,
                client_secret,
            } => format!(
                "Basic {}",
                STANDARD.encode(format!("{client_id}:{client_secret}"))
            ),
        }
    }
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BasicCredentials::Encoded(_) => f.write_str("Encoded(<redacted>)"),
            BasicCredentials::Client { client_id, .. } => f
                .debug_struct("Client")
                .field("client_id", client_id)
                .finish_non_exhaustive(),
        }
    }
}

/// Token endpoint request (after template interpolation)
#[derive(Debug, Clone)]
pub struct TokenRequest {
    /// Token endpoint URL
    pub url: String,
    /// Basic credentials
    pub basic: BasicCredentials,
    /// Form-encoded body, sent verbatim
    pub payload: String,
    /// Dotted path of the token in the response
    pub token_field: String,
}

impl TokenRequest {
    /// Create a request with the default `access_token` field
    pub fn new(url: impl Into<String>, basic: BasicCredentials, payload: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            basic,
            payload: payload.into(),
            token_field: "access_token".to_string(),
        }
    }

    /// Build from the `token` config section
    pub fn from_config(token: &TokenConfig) -> Result<Self> {
        let basic = match (&token.basic_auth, &token.client_id, &token.client_secret) {
            (Some(encoded), _, _) => BasicCredentials::Encoded(encoded.clone()),
            (None, Some(client_id), Some(client_secret)) => BasicCredentials::Client {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            },
            _ => return Err(Error::missing_field("token.basic_auth")),
        };

        Ok(Self {
            url: token.url.clone(),
            basic,
            payload: token.payload.clone(),
            token_field: token.token_field.clone(),
        })
    }
}
