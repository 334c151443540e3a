//! Steam Web API implementation
//!
//! This module talks HTTP to the Steam Web API:
//! - `ISteamUser/GetPlayerSummaries/v2` for profile summaries
//! - `IPlayerService/GetOwnedGames/v1` for owned games
//! - `ISteamUser/GetFriendList/v1` for friends lists
//!
//! # Status Mapping
//!
//! | Condition | RemoteError |
//! |-----------|-------------|
//! | HTTP 429 | `RateLimited` |
//! | HTTP 401 / 403 | `Unauthorized` |
//! | Other non-2xx | `Other` |
//! | Timeout / connection error | `Other` |
//! | Body does not match the typed shape | `Malformed` |

use crate::api::types::{FriendListEnvelope, OwnedItemsEnvelope, PlayerSummariesEnvelope};
use crate::api::{FriendEntry, OwnedItems, ProfileSummary, RemoteApi, RemoteError};
use crate::config::ApiConfig;
use crate::ids::NodeId;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds an HTTP client for the Steam Web API
///
/// # Example
///
/// ```no_run
/// use steam_harvest::config::ApiConfig;
/// use steam_harvest::api::build_http_client;
///
/// let client = build_http_client(&ApiConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(config.request_timeout())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `RemoteApi` backed by the Steam Web API
#[derive(Debug, Clone)]
pub struct SteamWebApi {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SteamWebApi {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Sends a GET request and decodes the JSON body into `T`
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("format", "json")])
            .query(query)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if let Some(err) = classify_status(status) {
            tracing::debug!("GET {} returned {}", path, status);
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Other(format!("failed to read body: {}", e)))?;

        serde_json::from_str(&body).map_err(|e| RemoteError::Malformed(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl RemoteApi for SteamWebApi {
    async fn player_summaries(&self, ids: &[NodeId]) -> Result<Vec<ProfileSummary>, RemoteError> {
        let joined = ids
            .iter()
            .map(NodeId::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let envelope: PlayerSummariesEnvelope = self
            .get_json(
                "ISteamUser/GetPlayerSummaries/v2/",
                &[("steamids", joined.as_str())],
            )
            .await?;
        Ok(envelope.response.players)
    }

    async fn owned_items(&self, id: &NodeId) -> Result<OwnedItems, RemoteError> {
        let envelope: OwnedItemsEnvelope = self
            .get_json(
                "IPlayerService/GetOwnedGames/v1/",
                &[
                    ("steamid", id.as_str()),
                    ("include_appinfo", "1"),
                    ("include_played_free_games", "1"),
                ],
            )
            .await?;
        Ok(envelope.response)
    }

    async fn friend_list(&self, id: &NodeId) -> Result<Vec<FriendEntry>, RemoteError> {
        let envelope: FriendListEnvelope = self
            .get_json(
                "ISteamUser/GetFriendList/v1/",
                &[("steamid", id.as_str()), ("relationship", "friend")],
            )
            .await?;
        Ok(envelope.friends_list.friends)
    }
}

/// Maps an HTTP status to the remote error it signals, if any
fn classify_status(status: StatusCode) -> Option<RemoteError> {
    if status.is_success() {
        return None;
    }

    Some(match status {
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RemoteError::Unauthorized(format!("HTTP {}", status.as_u16()))
        }
        _ => RemoteError::Other(format!("HTTP {}", status.as_u16())),
    })
}

fn classify_transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Other("request timeout".to_string())
    } else if e.is_connect() {
        RemoteError::Other(format!("connection failed: {}", e))
    } else {
        RemoteError::Other(e.to_string())
    }
}
