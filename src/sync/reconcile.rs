// Sync reconciliation controller.
//
// The single entry point through which every pick, feed-synced or
// manually entered, reaches the ledger. Both paths build the same
// DraftedPlayer record, differing only in provenance tags, and both
// trigger the same synchronous inflation recompute afterwards. That
// shared path is what makes the manual/auto parity invariant
// structural: there is no second code path for the engine to diverge
// on.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, warn};

use crate::db::Database;
use crate::engine::{self, InflationState};
use crate::ledger::player::{DraftedBy, DraftedPlayer, ProjectionRecord};
use crate::ledger::store::{DraftLedger, LeagueDraftState};
use crate::ledger::roster::Roster;
use crate::ledger::RosterConfig;

use super::retry::RetryController;
use super::{FeedError, PickEvent, SyncStatus};

/// Default minimum bid in budget units.
pub const DEFAULT_MIN_BID: f64 = 1.0;

// ---------------------------------------------------------------------------
// Submission types and errors
// ---------------------------------------------------------------------------

/// A pick typed in by the user.
#[derive(Debug, Clone)]
pub struct ManualPick {
    pub player_id: String,
    pub player_name: String,
    pub position: String,
    pub price: f64,
    /// True when the bid is for the user's own team, which subjects it
    /// to the budget rule.
    pub for_user_team: bool,
}

/// Which limit rejected a bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingLimit {
    RemainingBudget,
    MaxBid,
}

impl std::fmt::Display for BindingLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingLimit::RemainingBudget => write!(f, "remaining budget"),
            BindingLimit::MaxBid => write!(f, "max bid"),
        }
    }
}

/// Validation and persistence failures. Raised before (or rolled back
/// to undo) any ledger mutation; the caller can always retry.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SubmitError {
    #[error("bid of {requested} exceeds {binding} limit of {limit}")]
    BudgetExceeded {
        requested: f64,
        limit: f64,
        binding: BindingLimit,
    },

    #[error("bid of {requested} is below the minimum bid of {minimum}")]
    BelowMinimumBid { requested: f64, minimum: f64 },

    #[error("player {player_id} is already drafted in this league")]
    DuplicatePlayer { player_id: String },

    #[error("failed to persist pick: {0}")]
    Persist(String),
}

/// What a successful submission produced.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The pick as recorded, with the ledger-assigned timestamp.
    pub pick: DraftedPlayer,
    /// Freshly recomputed inflation state over the full snapshot.
    pub inflation: InflationState,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Owns the ledger and per-league sync status; the sole mutator of
/// both. Feed and manual picks converge here.
pub struct ReconcileController {
    ledger: DraftLedger,
    db: Option<Database>,
    statuses: HashMap<String, SyncStatus>,
    min_bid: f64,
    my_team_ref: String,
}

impl ReconcileController {
    pub fn new(ledger: DraftLedger, db: Option<Database>, min_bid: f64) -> Self {
        ReconcileController {
            ledger,
            db,
            statuses: HashMap::new(),
            min_bid,
            my_team_ref: "me".to_string(),
        }
    }

    /// Team reference the feed uses for the user's own picks.
    pub fn set_my_team_ref(&mut self, team_ref: &str) {
        self.my_team_ref = team_ref.to_string();
    }

    pub fn ledger(&self) -> &DraftLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut DraftLedger {
        &mut self.ledger
    }

    pub fn sync_status(&self, league_id: &str) -> Option<&SyncStatus> {
        self.statuses.get(league_id)
    }

    /// Give up the database handle, consuming the controller. Used to
    /// hand the store to a fresh controller across a restart.
    pub fn into_db(self) -> Option<Database> {
        self.db
    }

    /// The largest bid the user can place and still fill every other
    /// open roster slot at the minimum bid.
    fn max_bid_for(state: &LeagueDraftState, min_bid: f64) -> f64 {
        let open = state.roster.open_count();
        if open > 1 {
            state.remaining_budget - (open as f64 - 1.0) * min_bid
        } else {
            state.remaining_budget
        }
    }

    /// Submit a pick observed on the external draft-room feed.
    ///
    /// Returns `Ok(None)` (a logged no-op) when the league is unknown;
    /// an unexpected league id on the feed must never corrupt state or
    /// raise.
    pub fn submit_feed_pick(
        &mut self,
        league_id: &str,
        event: &PickEvent,
        projections: &[ProjectionRecord],
    ) -> Result<Option<SubmitOutcome>, SubmitError> {
        let drafted_by = if event.team_ref == self.my_team_ref {
            DraftedBy::User
        } else {
            DraftedBy::Other
        };

        let outcome = self.submit(
            league_id,
            &event.player_id,
            &event.player_name,
            None,
            event.price,
            drafted_by,
            false,
            projections,
        )?;

        if outcome.is_some() {
            let status = self.statuses.entry(league_id.to_string()).or_default();
            status.is_connected = true;
            status.is_syncing = false;
            status.failure_count = 0;
            status.last_error = None;
            status.last_success_at = Some(chrono::Utc::now());
        }
        Ok(outcome)
    }

    /// Submit a manually entered pick.
    ///
    /// A bid for the user's own team is validated against
    /// `min(remaining_budget, max_bid)` and the configured minimum bid
    /// before any mutation. Bids recorded for other teams are
    /// unconstrained by the user's budget. An unknown league is a
    /// logged no-op before any validation runs, matching the feed path.
    pub fn submit_manual_pick(
        &mut self,
        league_id: &str,
        entry: &ManualPick,
        projections: &[ProjectionRecord],
    ) -> Result<Option<SubmitOutcome>, SubmitError> {
        let Some(state) = self.ledger.get_draft(league_id) else {
            warn!("Manual pick submitted for unknown league {league_id}, ignoring");
            return Ok(None);
        };

        if entry.price < self.min_bid {
            return Err(SubmitError::BelowMinimumBid {
                requested: entry.price,
                minimum: self.min_bid,
            });
        }

        if entry.for_user_team {
            let remaining = state.remaining_budget;
            let max_bid = Self::max_bid_for(state, self.min_bid);
            let allowed = remaining.min(max_bid);
            if entry.price > allowed {
                let binding = if max_bid < remaining {
                    BindingLimit::MaxBid
                } else {
                    BindingLimit::RemainingBudget
                };
                return Err(SubmitError::BudgetExceeded {
                    requested: entry.price,
                    limit: allowed,
                    binding,
                });
            }
        }

        let drafted_by = if entry.for_user_team {
            DraftedBy::User
        } else {
            DraftedBy::Other
        };

        self.submit(
            league_id,
            &entry.player_id,
            &entry.player_name,
            Some(&entry.position),
            entry.price,
            drafted_by,
            true,
            projections,
        )
    }

    /// Shared submission path for both provenances.
    #[allow(clippy::too_many_arguments)]
    fn submit(
        &mut self,
        league_id: &str,
        player_id: &str,
        player_name: &str,
        position: Option<&str>,
        price: f64,
        drafted_by: DraftedBy,
        is_manual_entry: bool,
        projections: &[ProjectionRecord],
    ) -> Result<Option<SubmitOutcome>, SubmitError> {
        let Some(state) = self.ledger.get_draft(league_id) else {
            warn!("Pick submitted for unknown league {league_id}, ignoring");
            return Ok(None);
        };

        if state.has_player(player_id) {
            return Err(SubmitError::DuplicatePlayer {
                player_id: player_id.to_string(),
            });
        }

        // Snapshot for rollback if the durable write fails.
        let snapshot = state.clone();
        let remaining = state.remaining_budget;

        let projection = projections.iter().find(|p| p.player_id == player_id);
        if projection.is_none() {
            warn!("No projection for {player_name} ({player_id}), recording with zero value");
        }
        let pick = DraftedPlayer {
            player_id: player_id.to_string(),
            player_name: player_name.to_string(),
            position: position
                .map(str::to_string)
                .or_else(|| projection.map(|p| p.position.clone()))
                .unwrap_or_else(|| "UTIL".to_string()),
            purchase_price: price,
            projected_value: projection.map(|p| p.projected_value).unwrap_or(0.0),
            variance: 0.0,
            tier: projection.and_then(|p| p.tier),
            drafted_by,
            is_manual_entry,
            drafted_at: chrono::Utc::now(), // overwritten by the ledger
        };

        self.ledger.add_drafted_player(league_id, pick);
        if drafted_by == DraftedBy::User {
            self.ledger.update_budget(league_id, remaining - price);
        }

        let (recorded, picks) = match self.ledger.get_draft(league_id) {
            Some(state) => (
                state.drafted_players.last().cloned(),
                state.drafted_players.clone(),
            ),
            None => (None, Vec::new()),
        };
        let Some(recorded) = recorded else {
            return Ok(None);
        };

        // Durable write, with snapshot restore on failure. The budget
        // blob is best-effort: if it can't be written the budget is
        // rebuilt from the pick record on restore.
        if let Some(db) = &self.db {
            if let Err(e) = db.record_pick(league_id, &recorded) {
                warn!("Persist failed for {player_name}, rolling back: {e}");
                self.ledger.restore_draft(snapshot);
                return Err(SubmitError::Persist(e.to_string()));
            }
            let budget = self
                .ledger
                .get_draft(league_id)
                .map(|s| s.remaining_budget)
                .unwrap_or(remaining);
            if let Err(e) = db.save_state(&budget_key(league_id), &serde_json::json!(budget)) {
                warn!("Failed to persist budget for league {league_id}: {e}");
            }
        }

        // One synchronous recompute per pick, over the full snapshot.
        let inflation = engine::recompute(&picks, projections);
        info!(
            "League {league_id}: {} for {} ({}), overall rate now {:.4}",
            recorded.player_name, price, recorded.drafted_by, inflation.overall_rate
        );

        Ok(Some(SubmitOutcome {
            pick: recorded,
            inflation,
        }))
    }

    // -- feed status ---------------------------------------------------------

    /// Record a feed failure. Transient failures hand off to the retry
    /// controller; persistent ones stop it so the caller can surface
    /// the error for explicit user action. The ledger is untouched
    /// either way.
    pub fn handle_feed_failure(
        &mut self,
        league_id: &str,
        error: &FeedError,
        retry: &mut RetryController,
    ) {
        self.record_feed_error(league_id, error);

        if error.is_transient() {
            retry.on_failure();
        } else {
            warn!("League {league_id}: persistent feed failure: {error}");
            retry.abandon();
        }
    }

    /// Status-only failure record. Used by the event loop when
    /// `run_attempt` has already driven the retry machine, so driving
    /// it again here would double-count.
    pub fn record_feed_error(&mut self, league_id: &str, error: &FeedError) {
        let status = self.statuses.entry(league_id.to_string()).or_default();
        status.is_connected = false;
        status.is_syncing = false;
        status.failure_count += 1;
        status.last_error = Some(error.to_string());
    }

    /// Flag whether a reconnect attempt is in flight. Any completion
    /// path (`mark_connected`, `record_feed_error`, a delivered feed
    /// pick) clears it.
    pub fn mark_syncing(&mut self, league_id: &str, syncing: bool) {
        let status = self.statuses.entry(league_id.to_string()).or_default();
        status.is_syncing = syncing;
    }

    /// Mark the feed connected (initial connect or reconnect).
    pub fn mark_connected(&mut self, league_id: &str) {
        let status = self.statuses.entry(league_id.to_string()).or_default();
        status.is_connected = true;
        status.is_syncing = false;
        status.failure_count = 0;
        status.last_error = None;
        status.last_success_at = Some(chrono::Utc::now());
    }

    /// Toggle manual fallback mode. Affects which source is considered
    /// authoritative, never whether reconnection keeps being attempted.
    pub fn set_manual_mode(&mut self, league_id: &str, manual: bool) {
        let status = self.statuses.entry(league_id.to_string()).or_default();
        status.is_manual_mode = manual;
    }

    // -- restore -------------------------------------------------------------

    /// Rebuild a league from the durable store.
    ///
    /// Tolerates partial state: missing picks mean an empty list, a
    /// missing or corrupt budget blob is reconstructed from the user's
    /// recorded spend, and sync status starts from defaults.
    pub fn restore_league(
        &mut self,
        league_id: &str,
        initial_budget: f64,
        roster_config: &RosterConfig,
    ) {
        let picks = match &self.db {
            Some(db) => db.load_picks(league_id).unwrap_or_else(|e| {
                warn!("Failed to load picks for league {league_id}: {e}, starting empty");
                Vec::new()
            }),
            None => Vec::new(),
        };

        let user_spend: f64 = picks
            .iter()
            .filter(|p| p.drafted_by == DraftedBy::User)
            .map(|p| p.purchase_price)
            .sum();

        let remaining_budget = self
            .db
            .as_ref()
            .and_then(|db| db.load_state(&budget_key(league_id)).ok().flatten())
            .and_then(|v| v.as_f64())
            .unwrap_or(initial_budget - user_spend);

        let mut roster = Roster::new(roster_config);
        for pick in picks.iter().filter(|p| p.drafted_by == DraftedBy::User) {
            let kind = crate::ledger::roster::slot_kind_for_position(&pick.position);
            roster.assign(&pick.player_id, &pick.position, kind);
        }

        self.ledger.restore_draft(LeagueDraftState {
            league_id: league_id.to_string(),
            initial_budget,
            remaining_budget,
            roster,
            drafted_players: picks,
        });
        self.statuses
            .entry(league_id.to_string())
            .or_default();
    }

    /// Clear a league everywhere: ledger, status, and durable store.
    pub fn clear_league(&mut self, league_id: &str) {
        self.ledger.clear_draft(league_id);
        self.statuses.remove(league_id);
        if let Some(db) = &self.db {
            if let Err(e) = db.clear_picks(league_id) {
                warn!("Failed to clear persisted picks for league {league_id}: {e}");
            }
        }
    }
}

fn budget_key(league_id: &str) -> String {
    format!("budget:{league_id}")
}
