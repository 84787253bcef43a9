//! Error types for the sync pipeline.
//!
//! Errors are classified by recoverability:
//! - Retryable: rate limits, transient upstream failures
//! - Non-retryable until the operator acts: missing source access

use thiserror::Error;

use crate::db::DbError;

/// Errors surfaced by source adapters.
///
/// The kinds are typed so the sync engine never inspects message strings to
/// decide behavior.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The source exists but we lack access to the requested scope, e.g. the
    /// bot was never invited to a channel.
    #[error("no access to {scope}: {detail}")]
    SourceUnavailable { scope: String, detail: String },

    #[error("rate limited by upstream: {0}")]
    RateLimited(String),

    #[error("upstream request failed: {0}")]
    Upstream(String),
}

impl AdapterError {
    /// Returns true if retrying the same call later could succeed without
    /// operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdapterError::RateLimited(_) | AdapterError::Upstream(_)
        )
    }

    /// A suggested next step for the operator, when one exists.
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            AdapterError::SourceUnavailable { scope, .. } => Some(format!(
                "Grant the sync integration access to {} and run the sync again",
                scope
            )),
            AdapterError::RateLimited(_) => {
                Some("Wait for the upstream rate limit window to pass".to_string())
            }
            AdapterError::Upstream(_) => None,
        }
    }
}

/// Errors from a single sync scope.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] AdapterError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("channel {0} not found at the source")]
    UnknownChannel(String),
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Source(e) => e.is_retryable(),
            SyncError::Db(_) => false,
            SyncError::UnknownChannel(_) => false,
        }
    }

    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            SyncError::Source(e) => e.recovery_suggestion(),
            SyncError::UnknownChannel(id) => Some(format!(
                "Remove channel {} from the sync list or re-create it at the source",
                id
            )),
            SyncError::Db(_) => None,
        }
    }
}
