//! Quota-aware API client with retry logic
//!
//! Every remote call made by the harvester goes through `RateLimitedClient`.
//! It enforces the global call budget, retries rate-limited attempts with
//! exponential backoff and turns every failure into a `CallError` the
//! caller can classify.
//!
//! # Retry Logic
//!
//! | Remote signal | Action |
//! |---------------|--------|
//! | Rate limited | Wait `base * 2^attempt`, retry up to `max_attempts` |
//! | Unauthorized | Immediate → `CallError::Denied` |
//! | Malformed / other | Immediate → `CallError::Failed` |
//!
//! Both waits (quota reset and backoff) end early with `CallError::Cancelled`
//! once the client's cancellation token fires.

use crate::api::quota::QuotaState;
use crate::api::{FriendEntry, OwnedItems, ProfileSummary, RemoteApi, RemoteError};
use crate::config::{Config, RetryConfig};
use crate::ids::NodeId;
use crate::output::ErrorLog;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Maximum number of ids the profile lookup accepts per call
pub const PROFILE_BATCH_SIZE: usize = 100;

/// Outcome of a logical call that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// Every attempt was rate limited
    #[error("max retries exceeded after {attempts} rate-limited attempts")]
    RetriesExhausted { attempts: u32 },

    /// The remote service refused access to this account's data
    #[error("access denied: {0}")]
    Denied(String),

    /// Any other, non-retryable failure
    #[error("API call failed: {0}")]
    Failed(String),

    /// The run was cancelled while the call waited for quota or backoff
    #[error("call cancelled")]
    Cancelled,
}

impl CallError {
    /// Returns true if this is an authorization denial
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::Denied(_))
    }

    /// Returns true if the call failed only because of rate limiting
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }
}

/// How rate-limited attempts are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per logical call
    pub max_attempts: u32,

    /// Delay after the first rate-limited attempt
    pub base_delay: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            base_delay: config.base_delay(),
        }
    }
}

/// Backoff delay after the rate-limited attempt numbered `attempt` (from 0)
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// API client enforcing the call quota and retrying rate-limited calls
pub struct RateLimitedClient {
    api: Arc<dyn RemoteApi>,
    quota: Mutex<QuotaState>,
    retry: RetryPolicy,
    error_log: Option<Arc<ErrorLog>>,
    cancel: CancellationToken,
}

impl RateLimitedClient {
    pub fn new(api: Arc<dyn RemoteApi>, quota: QuotaState, retry: RetryPolicy) -> Self {
        Self {
            api,
            quota: Mutex::new(quota),
            retry,
            error_log: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Builds a client from the quota and retry sections of the config
    pub fn from_config(api: Arc<dyn RemoteApi>, config: &Config) -> Self {
        let quota = QuotaState::new(config.quota.daily_limit, config.quota.reset_window());
        Self::new(api, quota, RetryPolicy::from(&config.retry))
    }

    /// Records failed calls in the given error log in addition to tracing
    pub fn with_error_log(mut self, error_log: Arc<ErrorLog>) -> Self {
        self.error_log = Some(error_log);
        self
    }

    /// Abandons quota and backoff waits once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Executes one logical call
    ///
    /// The call is counted against the quota once, however many attempts it
    /// takes. If the quota is exhausted the caller is held until the window
    /// resets; every other caller queues behind it.
    pub async fn call<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> Result<T, CallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        self.acquire_quota().await?;

        for attempt in 0..self.retry.max_attempts {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(RemoteError::RateLimited) => {
                    let delay = backoff_delay(self.retry.base_delay, attempt);
                    tracing::debug!(
                        "{} rate limited (attempt {}/{}), backing off {:?}",
                        operation,
                        attempt + 1,
                        self.retry.max_attempts,
                        delay
                    );
                    self.pause(delay).await?;
                }
                Err(RemoteError::Unauthorized(detail)) => {
                    self.record_error(format!("API call {} denied: {}", operation, detail));
                    return Err(CallError::Denied(detail));
                }
                Err(other) => {
                    self.record_error(format!("API call {} failed: {}", operation, other));
                    return Err(CallError::Failed(other.to_string()));
                }
            }
        }

        self.record_error(format!("Max retries exceeded for API call {}", operation));
        Err(CallError::RetriesExhausted {
            attempts: self.retry.max_attempts,
        })
    }

    /// Looks up profile summaries, batching ids into groups of 100
    ///
    /// Each batch is one logical call.
    pub async fn player_summaries(&self, ids: &[NodeId]) -> Result<Vec<ProfileSummary>, CallError> {
        let mut summaries = Vec::with_capacity(ids.len());
        for batch in ids.chunks(PROFILE_BATCH_SIZE) {
            let players = self
                .call("player_summaries", || self.api.player_summaries(batch))
                .await?;
            summaries.extend(players);
        }
        Ok(summaries)
    }

    pub async fn owned_items(&self, id: &NodeId) -> Result<OwnedItems, CallError> {
        self.call("owned_items", || self.api.owned_items(id)).await
    }

    pub async fn friend_list(&self, id: &NodeId) -> Result<Vec<FriendEntry>, CallError> {
        self.call("friend_list", || self.api.friend_list(id)).await
    }

    /// Total logical calls issued through this client
    pub async fn calls_made(&self) -> u64 {
        self.quota.lock().await.total_calls()
    }

    /// Counts one call against the quota, waiting for a reset if it is spent
    ///
    /// A cancelled wait releases the lock without counting the call.
    async fn acquire_quota(&self) -> Result<(), CallError> {
        let mut quota = tokio::select! {
            quota = self.quota.lock() => quota,
            _ = self.cancel.cancelled() => return Err(CallError::Cancelled),
        };
        if let Some(wait) = quota.wait_time(Instant::now()) {
            tracing::warn!(
                "API limit of {} calls reached, pausing {:?} until reset",
                quota.limit(),
                wait
            );
            self.pause(wait).await?;
            quota.reset(Instant::now());
        }
        quota.record_call();
        Ok(())
    }

    async fn pause(&self, duration: Duration) -> Result<(), CallError> {
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.cancel.cancelled() => {
                tracing::debug!("Wait of {:?} abandoned on cancellation", duration);
                Err(CallError::Cancelled)
            }
        }
    }

    fn record_error(&self, message: String) {
        match &self.error_log {
            Some(log) => log.record(&message),
            None => tracing::warn!("{}", message),
        }
    }
}
