//! Cached IAM token provider
//!
//! The hot path is a lock-free read of the cached snapshot; only stale or
//! missing tokens take the refresh mutex. Concurrent callers hitting a stale
//! cache coalesce into a single upstream exchange: the first holder refreshes,
//! the rest re-check the cache after acquiring the lock and return the token
//! the winner stored.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::IamAuthConfig;
use crate::error::CredentialError;
use crate::jwt::create_exchange_jwt;
use crate::ports::TokenProvider;
use crate::source::CredentialSource;

/// Assumed lifetime when the token response carries no expiry
const DEFAULT_TOKEN_TTL_SECONDS: i64 = 3600;

/// Accepted token field names, in priority order
const TOKEN_FIELDS: [&str; 3] = ["iamToken", "iam_token", "access_token"];

/// Accepted expiry field names, in priority order
const EXPIRY_FIELDS: [&str; 4] = ["expiresAt", "expires_at", "expiresIn", "expires_in"];

#[derive(Debug, Clone)]
struct TokenSnapshot {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Caching credential provider for the IAM token service
#[derive(Debug)]
pub struct IamTokenProvider {
    config: IamAuthConfig,
    source: CredentialSource,
    http: reqwest::Client,
    clock: Arc<dyn Clock>,
    cached: ArcSwapOption<TokenSnapshot>,
    refresh_lock: Mutex<()>,
}

impl IamTokenProvider {
    /// Create a provider using the system clock
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Config` when the configuration is invalid or
    /// a configured service-account key cannot be loaded.
    pub fn new(config: IamAuthConfig) -> Result<Self, CredentialError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a provider with an injected clock
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::Config` when the configuration is invalid or
    /// a configured service-account key cannot be loaded.
    pub fn with_clock(
        config: IamAuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CredentialError> {
        config.validate().map_err(CredentialError::Config)?;
        let source = CredentialSource::resolve(&config)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.http_timeout_ms))
            .build()?;

        Ok(Self {
            config,
            source,
            http,
            clock,
            cached: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
        })
    }

    fn static_token(&self) -> Option<String> {
        match &self.source {
            CredentialSource::StaticToken { value } => Some(value.clone()),
            _ => None,
        }
    }

    fn is_stale(&self, snapshot: &TokenSnapshot) -> bool {
        let now = self.clock.now();
        let skew = chrono::Duration::seconds(i64::from(self.config.token_skew_seconds));
        let min_ttl = chrono::Duration::seconds(i64::from(self.config.token_min_ttl_seconds));
        now >= snapshot.expires_at - skew || snapshot.expires_at - now < min_ttl
    }

    async fn refresh_singleflight(&self, force: bool) -> Result<String, CredentialError> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if !force
            && let Some(snapshot) = self.cached.load_full()
            && !self.is_stale(&snapshot)
        {
            return Ok(snapshot.token.clone());
        }

        let snapshot = self.refresh_with_retry().await?;
        let token = snapshot.token.clone();
        self.cached.store(Some(Arc::new(snapshot)));
        Ok(token)
    }

    async fn refresh_with_retry(&self) -> Result<TokenSnapshot, CredentialError> {
        let attempts = self.config.refresh_retry_attempts.max(1);
        let mut last = CredentialError::temporary();

        for attempt in 1..=attempts {
            match self.fetch_token().await {
                Ok(snapshot) => {
                    debug!(expires_at = %snapshot.expires_at, "obtained IAM token");
                    return Ok(snapshot);
                },
                Err(err @ CredentialError::Config(_)) => return Err(err),
                Err(err) => {
                    warn!(attempt, error = %err, "IAM token refresh failed");
                    last = err;
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff_delay(attempt)).await;
                    }
                },
            }
        }

        Err(last)
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.refresh_retry_base_ms;
        let max = self.config.refresh_retry_max_ms.max(base);
        let exponential = base
            .saturating_mul(1_u64 << (attempt.saturating_sub(1)).min(16))
            .min(max);
        let jitter: f64 = rand::rng().random_range(0.5..1.5);
        let delay = (exponential as f64 * jitter) as u64;
        Duration::from_millis(delay.min(max))
    }

    #[instrument(skip(self))]
    async fn fetch_token(&self) -> Result<TokenSnapshot, CredentialError> {
        match &self.source {
            CredentialSource::ServiceAccount(key) => {
                let now = self.clock.now();
                let jwt = create_exchange_jwt(key, &self.config.iam_token_url, now)?;
                let response = self
                    .http
                    .post(&self.config.iam_token_url)
                    .json(&serde_json::json!({ "jwt": jwt }))
                    .send()
                    .await?;
                self.parse_token_response(response).await
            },
            CredentialSource::InstanceMetadata { endpoint } => {
                let response = self
                    .http
                    .get(endpoint)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?;
                self.parse_token_response(response).await
            },
            CredentialSource::StaticToken { value } => Ok(TokenSnapshot {
                token: value.clone(),
                expires_at: DateTime::<Utc>::MAX_UTC,
            }),
            CredentialSource::Unconfigured => Err(CredentialError::Config(
                "IAM token source is not configured".to_string(),
            )),
        }
    }

    async fn parse_token_response(
        &self,
        response: reqwest::Response,
    ) -> Result<TokenSnapshot, CredentialError> {
        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status));
        }

        let body: Value = response.json().await?;
        let token = extract_token(&body).ok_or_else(|| {
            CredentialError::Config("IAM response did not contain a token".to_string())
        })?;

        let now = self.clock.now();
        let expires_at = extract_expiry(&body, now)
            .unwrap_or_else(|| now + chrono::Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS));

        Ok(TokenSnapshot { token, expires_at })
    }
}

#[async_trait]
impl TokenProvider for IamTokenProvider {
    async fn get_token(&self) -> Result<String, CredentialError> {
        if let Some(token) = self.static_token() {
            return Ok(token);
        }
        if let Some(snapshot) = self.cached.load_full()
            && !self.is_stale(&snapshot)
        {
            return Ok(snapshot.token.clone());
        }
        self.refresh_singleflight(false).await
    }

    #[instrument(skip(self))]
    async fn force_refresh(&self) -> Result<String, CredentialError> {
        if let Some(token) = self.static_token() {
            return Ok(token);
        }
        self.cached.store(None);
        self.refresh_singleflight(true).await
    }
}

fn map_status(status: StatusCode) -> CredentialError {
    if status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
    {
        CredentialError::temporary()
    } else {
        CredentialError::Config("IAM authentication is misconfigured or rejected".to_string())
    }
}

fn extract_token(body: &Value) -> Option<String> {
    TOKEN_FIELDS
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Best-effort expiry extraction
///
/// Numbers (and all-digit strings) are read as lifetimes in seconds from
/// now; other strings must be RFC 3339 instants. A bare absolute Unix
/// timestamp is therefore misread as a lifetime, matching the long-standing
/// behavior of this exchange.
fn extract_expiry(body: &Value, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    for field in EXPIRY_FIELDS {
        let Some(value) = body.get(field) else {
            continue;
        };
        if let Some(seconds) = value.as_i64() {
            return Some(now + chrono::Duration::seconds(seconds));
        }
        if let Some(text) = value.as_str() {
            let text = text.trim();
            if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
                return Some(parsed.with_timezone(&Utc));
            }
            // Some token services return numeric lifetimes as strings.
            if !text.is_empty()
                && text.chars().all(|c| c.is_ascii_digit())
                && let Ok(seconds) = text.parse::<i64>()
            {
                return Some(now + chrono::Duration::seconds(seconds));
            }
        }
    }
    None
}
