//! Authentication module
//!
//! Token endpoint client: `POST` with Basic auth and a form-encoded body,
//! returning an opaque bearer [`Credential`]. Credentials are plain values
//! owned by the caller; nothing here caches or refreshes them.

mod provider;
mod types;

pub use provider::{extract_jsonpath, HttpTokenProvider, TokenProvider};
pub use types::{BasicCredentials, Credential, TokenRequest};
