//! IAM Auth - cached credential provider for Yandex Cloud IAM
//!
//! Obtains short-lived IAM tokens for upstream speech calls and caches them
//! until they approach expiry. Supported sources, in precedence order:
//! - Service-account key: sign a PS256 JWT and exchange it at the token
//!   endpoint
//! - Static token: a pre-issued token returned verbatim
//! - Instance metadata: fetch tokens from the compute metadata service
//!
//! # Architecture
//!
//! The `ports` module defines the [`TokenProvider`] trait consumed by
//! upstream clients; [`IamTokenProvider`] is the caching implementation.
//! Concurrent callers that find the cache stale coalesce into a single
//! refresh, and temporary IAM failures are retried with jittered exponential
//! backoff.
//!
//! # Example
//!
//! ```ignore
//! use iam_auth::{IamAuthConfig, IamTokenProvider, TokenProvider};
//!
//! let config = IamAuthConfig {
//!     sa_key_file: Some("/etc/speech-gateway/sa-key.json".to_string()),
//!     ..Default::default()
//! };
//! let provider = IamTokenProvider::new(config)?;
//! let token = provider.get_token().await?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
mod jwt;
pub mod ports;
pub mod provider;
pub mod source;

#[cfg(test)]
pub(crate) mod testkeys;

pub use clock::{Clock, SystemClock};
pub use config::IamAuthConfig;
pub use error::CredentialError;
pub use ports::TokenProvider;
pub use provider::IamTokenProvider;
pub use source::{CredentialSource, ServiceAccountKey};
