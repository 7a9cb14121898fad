//! Character listing client abstraction
//!
//! The State Manager only talks to the listing endpoint through the
//! [`CharacterApi`] trait, so tests can script responses and their
//! resolution order.
//!
//! # Architecture
//!
//! ```text
//! CharacterApi trait
//! └── HttpCharacterApi (reqwest, GET {api_url}/character)
//! ```
//!
//! Futures are boxed and `'static` so the trait stays object-safe and
//! each call can be spawned onto the runtime independently of the caller.

use crate::models::Page;
use futures::future::BoxFuture;
use std::fmt;

mod http;

pub use http::HttpCharacterApi;

/// Errors returned by the listing client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Transport failure or non-success HTTP status
    Network(String),
    /// The body could not be decoded into a page
    Decode(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// Remote source of character pages
pub trait CharacterApi: Send + Sync {
    /// Human-readable name for logging
    fn name(&self) -> &'static str;

    /// Fetch one page of the full listing (pages start at 1)
    fn fetch_page(&self, page: u32) -> BoxFuture<'static, Result<Page, ApiError>>;

    /// Fetch characters whose name matches `name` (matching is server-side)
    fn search_by_name(&self, name: &str) -> BoxFuture<'static, Result<Page, ApiError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        assert_eq!(
            ApiError::Network("connection refused".to_string()).to_string(),
            "Network error: connection refused"
        );
        assert_eq!(
            ApiError::Decode("missing field `id`".to_string()).to_string(),
            "Decode error: missing field `id`"
        );
    }
}
