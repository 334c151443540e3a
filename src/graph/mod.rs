//! Social graph discovery
//!
//! Walks the friends relation breadth-first from a seed account, bounded by
//! a maximum hop depth, to produce the set of accounts to harvest.

mod discover;
mod frontier;

pub use discover::discover;
pub use frontier::{Frontier, QueuedNode};
