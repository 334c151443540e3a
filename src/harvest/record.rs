//! Harvested data for one account

use crate::api::{FriendEntry, OwnedItems, ProfileSummary};
use crate::ids::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything harvested for one account
///
/// Each sub-record is independently optional: a task that fails part way
/// keeps whatever it fetched before the failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestRecord {
    pub node_id: NodeId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileSummary>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owned_items: Option<OwnedItems>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friends: Option<Vec<FriendRelationship>>,
}

impl HarvestRecord {
    /// Creates a record with no sub-records
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            profile: None,
            owned_items: None,
            friends: None,
        }
    }

    /// Returns true if no sub-record was fetched
    pub fn is_empty(&self) -> bool {
        self.profile.is_none() && self.owned_items.is_none() && self.friends.is_none()
    }
}

/// A friendship with a known start date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendRelationship {
    pub friend_id: NodeId,

    /// Start of the friendship as a `YYYY-MM-DD` date (UTC)
    pub friend_since: String,

    /// Whole days from the start of the friendship until `now`
    pub friendship_duration_days: i64,
}

/// Builds the relationship for a friends-list entry
///
/// Returns `None` when the entry carries no usable `friend_since` timestamp.
/// Steam reports `0` for friendships with no recorded start.
pub fn friendship_from(entry: &FriendEntry, now: DateTime<Utc>) -> Option<FriendRelationship> {
    let timestamp = entry.friend_since.filter(|&secs| secs != 0)?;
    let since = DateTime::<Utc>::from_timestamp(timestamp, 0)?;
    Some(FriendRelationship {
        friend_id: entry.node_id.clone(),
        friend_since: since.format("%Y-%m-%d").to_string(),
        friendship_duration_days: (now - since).num_days(),
    })
}

/// Converts a friends list, dropping entries without a start date
pub fn friendships_from(entries: &[FriendEntry], now: DateTime<Utc>) -> Vec<FriendRelationship> {
    entries
        .iter()
        .filter_map(|entry| friendship_from(entry, now))
        .collect()
}
