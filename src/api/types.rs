//! Typed records for remote API responses
//!
//! Every response is decoded into an explicit record. Fields the service
//! always sends are required; everything that depends on the account's
//! privacy settings is optional. A body that does not fit these shapes is
//! rejected as malformed.

use crate::ids::NodeId;
use serde::{Deserialize, Serialize};

/// Public profile summary of an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    #[serde(rename = "steamid")]
    pub node_id: NodeId,

    #[serde(rename = "personaname")]
    pub persona_name: String,

    #[serde(rename = "profileurl", default, skip_serializing_if = "Option::is_none")]
    pub profile_url: Option<String>,

    #[serde(rename = "avatarfull", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    #[serde(rename = "personastate", default, skip_serializing_if = "Option::is_none")]
    pub persona_state: Option<u8>,

    #[serde(
        rename = "communityvisibilitystate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub visibility_state: Option<u8>,

    #[serde(rename = "timecreated", default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<i64>,

    #[serde(rename = "lastlogoff", default, skip_serializing_if = "Option::is_none")]
    pub last_logoff: Option<i64>,

    #[serde(rename = "realname", default, skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,

    #[serde(rename = "loccountrycode", default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

impl ProfileSummary {
    /// Creates a summary with only the required fields set
    pub fn new(node_id: impl Into<NodeId>, persona_name: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            persona_name: persona_name.into(),
            profile_url: None,
            avatar_url: None,
            persona_state: None,
            visibility_state: None,
            time_created: None,
            last_logoff: None,
            real_name: None,
            country_code: None,
        }
    }
}

/// Items (games) owned by an account
///
/// A private library comes back as an empty response, which decodes to
/// `item_count: None` and no items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnedItems {
    #[serde(rename = "game_count", default, skip_serializing_if = "Option::is_none")]
    pub item_count: Option<u32>,

    #[serde(rename = "games", default)]
    pub items: Vec<OwnedItem>,
}

/// One owned game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedItem {
    pub appid: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Total playtime in minutes
    #[serde(default)]
    pub playtime_forever: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playtime_2weeks: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_icon_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtime_last_played: Option<i64>,
}

/// One entry of an account's friends list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendEntry {
    #[serde(rename = "steamid")]
    pub node_id: NodeId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,

    /// Unix timestamp at which the friendship started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friend_since: Option<i64>,
}

impl FriendEntry {
    pub fn new(node_id: impl Into<NodeId>, friend_since: Option<i64>) -> Self {
        Self {
            node_id: node_id.into(),
            relationship: Some("friend".to_string()),
            friend_since,
        }
    }
}

// ===== Wire envelopes =====

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerSummariesEnvelope {
    pub response: PlayerSummariesBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayerSummariesBody {
    #[serde(default)]
    pub players: Vec<ProfileSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnedItemsEnvelope {
    pub response: OwnedItems,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FriendListEnvelope {
    #[serde(rename = "friendslist")]
    pub friends_list: FriendListBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FriendListBody {
    #[serde(default)]
    pub friends: Vec<FriendEntry>,
}
