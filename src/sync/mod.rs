// Sync layer: feed reconciliation and resilient reconnection.

pub mod reconcile;
pub mod retry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use reconcile::{
    BindingLimit, ManualPick, ReconcileController, SubmitError, SubmitOutcome, DEFAULT_MIN_BID,
};
pub use retry::{run_attempt, RetryController, RetryPhase, RetryPolicy, RetryState, RetryTick};

// ---------------------------------------------------------------------------
// Feed events and failures
// ---------------------------------------------------------------------------

/// A completed pick as emitted by the external draft-room poller.
///
/// The poller's transport and cadence are not owned here; only its
/// emitted events and failures matter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickEvent {
    pub player_id: String,
    pub player_name: String,
    pub price: f64,
    /// Opaque reference to the winning team, compared against the
    /// configured team reference to attribute the pick.
    pub team_ref: String,
}

/// A failure reported by the external draft-room feed.
///
/// Transient failures are handed to the retry controller; persistent
/// ones are surfaced for explicit user action instead of being retried
/// on the same schedule forever.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("feed request timed out")]
    Timeout,

    #[error("feed network error: {0}")]
    Network(String),

    #[error("feed authentication rejected")]
    Auth,

    #[error("draft room not found")]
    NotFound,

    #[error("feed rate limited")]
    RateLimited,
}

impl FeedError {
    /// Transient failures get scheduled retries; the rest do not.
    pub fn is_transient(&self) -> bool {
        matches!(self, FeedError::Timeout | FeedError::Network(_))
    }
}

/// Seam for re-establishing the feed connection.
///
/// The retry state machine never performs network calls itself; the
/// event loop drives an implementation of this trait when an attempt
/// comes due. Tests substitute scripted outcomes.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn reconnect(&self) -> Result<(), FeedError>;
}

// ---------------------------------------------------------------------------
// Sync status read model
// ---------------------------------------------------------------------------

/// Per-league sync status, consumed by the presentation layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatus {
    pub is_connected: bool,
    /// A reconnect attempt is in flight. Set by the event loop around
    /// each attempt, cleared on any outcome.
    pub is_syncing: bool,
    /// Manual fallback: user-entered picks are authoritative. Never
    /// suspends reconnection attempts.
    pub is_manual_mode: bool,
    pub failure_count: u32,
    pub last_error: Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_vs_persistent() {
        assert!(FeedError::Timeout.is_transient());
        assert!(FeedError::Network("reset".into()).is_transient());
        assert!(!FeedError::Auth.is_transient());
        assert!(!FeedError::NotFound.is_transient());
        assert!(!FeedError::RateLimited.is_transient());
    }

    #[test]
    fn sync_status_defaults() {
        let status = SyncStatus::default();
        assert!(!status.is_connected);
        assert!(!status.is_syncing);
        assert!(!status.is_manual_mode);
        assert_eq!(status.failure_count, 0);
        assert!(status.last_error.is_none());
        assert!(status.last_success_at.is_none());
    }
}
