//! Outcome classes recorded in the progress ledger
//!
//! Every harvested account ends a run in exactly one of these classes.
use std::fmt;

/// The last known outcome of harvesting an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Every sub-call succeeded; never harvested again
    Succeeded,

    /// The remote service refused access to the account's data
    Denied,

    /// Failed for a potentially recoverable reason; retried on the next run
    PendingRetry,
}

impl Outcome {
    /// Returns true if an account with this outcome is never harvested again
    ///
    /// Denials are only reconsidered when the harvester is configured to
    /// retry them.
    pub fn is_resolved(&self, retry_denied: bool) -> bool {
        match self {
            Self::Succeeded => true,
            Self::Denied => !retry_denied,
            Self::PendingRetry => false,
        }
    }

    /// Converts the outcome to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Denied => "denied",
            Self::PendingRetry => "pending_retry",
        }
    }

    /// Parses an outcome from its database string representation
    ///
    /// Returns None if the string doesn't match any known outcome.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "succeeded" => Some(Self::Succeeded),
            "denied" => Some(Self::Denied),
            "pending_retry" => Some(Self::PendingRetry),
            _ => None,
        }
    }

    /// Returns all outcomes
    pub fn all() -> [Self; 3] {
        [Self::Succeeded, Self::Denied, Self::PendingRetry]
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
