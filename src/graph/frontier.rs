//! Breadth-first frontier for graph discovery

use crate::ids::NodeId;
use std::collections::{HashSet, VecDeque};

/// A node waiting to be expanded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedNode {
    pub id: NodeId,

    /// Hops from the seed
    pub depth: u32,
}

/// FIFO frontier paired with the set of every node ever enqueued
///
/// A node is enqueued at most once, so discovery terminates on cyclic
/// graphs and every depth-d node is dequeued before any depth-d+1 node.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<QueuedNode>,
    visited: HashSet<NodeId>,
}

impl Frontier {
    /// Creates a frontier holding only the seed at depth 0
    pub fn new(seed: NodeId) -> Self {
        let mut frontier = Self {
            queue: VecDeque::new(),
            visited: HashSet::new(),
        };
        frontier.push(seed, 0);
        frontier
    }

    /// Enqueues `id` at `depth` unless it was already seen
    ///
    /// Returns true if the node was new.
    pub fn push(&mut self, id: NodeId, depth: u32) -> bool {
        if self.visited.contains(&id) {
            return false;
        }
        self.visited.insert(id.clone());
        self.queue.push_back(QueuedNode { id, depth });
        true
    }

    pub fn pop(&mut self) -> Option<QueuedNode> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Consumes the frontier, returning every node that was enqueued
    pub fn into_visited(self) -> HashSet<NodeId> {
        self.visited
    }
}
