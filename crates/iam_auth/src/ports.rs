//! Port for credential consumers

use async_trait::async_trait;

use crate::error::CredentialError;

/// Supplies bearer tokens for upstream calls
///
/// Implementations cache aggressively; `get_token` is expected to be cheap on
/// the hot path. `force_refresh` discards any cached token first and is the
/// hook callers use after an upstream 401/403.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a token that is fresh at the time of the call
    async fn get_token(&self) -> Result<String, CredentialError>;

    /// Discard the cached token and fetch a new one
    async fn force_refresh(&self) -> Result<String, CredentialError>;
}
