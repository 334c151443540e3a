//! Remote API access
//!
//! This module contains everything that talks to the remote service:
//! - The `RemoteApi` trait describing the three operations the harvester needs
//! - The `SteamWebApi` HTTP implementation
//! - The `RateLimitedClient` that enforces the call quota and retries
//!   rate-limited calls with exponential backoff

mod client;
mod quota;
mod steam;
mod types;

pub use client::{backoff_delay, CallError, RateLimitedClient, RetryPolicy, PROFILE_BATCH_SIZE};
pub use quota::QuotaState;
pub use steam::{build_http_client, SteamWebApi};
pub use types::{FriendEntry, OwnedItem, OwnedItems, ProfileSummary};

use crate::ids::NodeId;
use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by the remote service for a single attempt
///
/// The variants are the structured codes the client branches on; no caller
/// inspects the message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The service asked us to slow down (HTTP 429)
    #[error("rate limited by remote service")]
    RateLimited,

    /// The account's data is not visible to us (HTTP 401/403)
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The response did not have the expected shape
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Any other failure (transport, server error, ...)
    #[error("{0}")]
    Other(String),
}

/// The three operations the harvester needs from the remote service
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Looks up profile summaries for up to 100 accounts at once
    async fn player_summaries(&self, ids: &[NodeId]) -> Result<Vec<ProfileSummary>, RemoteError>;

    /// Looks up the items (games) owned by an account
    async fn owned_items(&self, id: &NodeId) -> Result<OwnedItems, RemoteError>;

    /// Looks up an account's friends list
    async fn friend_list(&self, id: &NodeId) -> Result<Vec<FriendEntry>, RemoteError>;
}
