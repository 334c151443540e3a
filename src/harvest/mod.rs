//! Harvest pipeline
//!
//! For every discovered account that the ledger has not resolved yet, fetch
//! the profile, owned items and friends through the rate-limited client,
//! classify the outcome and record it.

mod pipeline;
mod record;
mod runner;

pub use pipeline::{HarvestFailure, HarvestReport, Harvester};
pub use record::{friendship_from, friendships_from, FriendRelationship, HarvestRecord};
pub use runner::{run_harvest, run_harvest_with_api, run_harvest_with_store};
