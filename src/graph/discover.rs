//! Breadth-first discovery over the friends relation

use crate::api::{CallError, RateLimitedClient};
use crate::graph::frontier::Frontier;
use crate::ids::NodeId;
use crate::output::ErrorLog;
use std::collections::{BTreeMap, HashSet};
use tokio_util::sync::CancellationToken;

/// Discovers every account within `max_depth` hops of `seed`
///
/// Nodes are expanded in breadth-first order through the client's friends
/// lookup. Nodes at exactly `max_depth` are returned but not expanded. A
/// failed lookup is written to the error log and the node is treated as
/// having no friends. The seed is always part of the result.
///
/// If `cancel` fires, discovery stops and returns what was visited so far.
pub async fn discover(
    client: &RateLimitedClient,
    seed: &NodeId,
    max_depth: u32,
    error_log: &ErrorLog,
    cancel: &CancellationToken,
) -> HashSet<NodeId> {
    let mut frontier = Frontier::new(seed.clone());
    let mut per_depth: BTreeMap<u32, usize> = BTreeMap::new();
    let mut expanded = 0usize;

    tracing::info!("Discovering accounts from {} (max depth {})", seed, max_depth);

    while let Some(node) = frontier.pop() {
        *per_depth.entry(node.depth).or_insert(0) += 1;

        if node.depth >= max_depth {
            continue;
        }

        if cancel.is_cancelled() {
            tracing::warn!(
                "Discovery cancelled with {} accounts still queued",
                frontier.len()
            );
            break;
        }

        let friends = match client.friend_list(&node.id).await {
            Ok(friends) => friends,
            Err(CallError::Cancelled) => {
                tracing::warn!("Discovery cancelled while expanding {}", node.id);
                break;
            }
            Err(e) => {
                error_log.record(format_args!(
                    "Failed to fetch friends of {} during discovery: {}",
                    node.id, e
                ));
                continue;
            }
        };

        expanded += 1;
        let mut added = 0;
        for friend in friends {
            if frontier.push(friend.node_id, node.depth + 1) {
                added += 1;
            }
        }

        tracing::debug!(
            "Expanded {} at depth {}: {} new accounts, {} queued",
            node.id,
            node.depth,
            added,
            frontier.len()
        );

        if expanded % 10 == 0 {
            tracing::info!(
                "Discovery progress: {} accounts expanded, {} seen, {} queued",
                expanded,
                frontier.visited_count(),
                frontier.len()
            );
        }
    }

    for (depth, count) in &per_depth {
        tracing::info!("Depth {}: {} accounts", depth, count);
    }

    let visited = frontier.into_visited();
    tracing::info!(
        "Discovery finished: {} accounts found, {} expanded",
        visited.len(),
        expanded
    );
    visited
}
