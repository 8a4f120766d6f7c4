// Keyed draft ledger: the authoritative per-league record of budget,
// roster, and drafted players.
//
// The ledger is a plain injected store, not an ambient singleton. All
// reads and writes go through its operation set. Mutators against an
// unknown league id are logged no-ops; accessors return None/empty.
// Recomputation is deliberately NOT triggered here; the reconciliation
// controller owns that, keeping ledger and engine decoupled.

use std::collections::HashMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::player::DraftedPlayer;
use super::roster::{slot_kind_for_position, Roster, RosterConfig};

// ---------------------------------------------------------------------------
// View state (sort / filter)
// ---------------------------------------------------------------------------

/// Column the pick list is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    DraftedAt,
    Price,
    Name,
    ProjectedValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub column: SortColumn,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        SortState {
            column: SortColumn::DraftedAt,
            direction: SortDirection::Ascending,
        }
    }
}

/// Pick-list status filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    /// Only the user's own picks.
    UserTeam,
    /// Only other teams' picks.
    OtherTeams,
    /// Only manually entered picks.
    ManualOnly,
}

/// Transient view state shared by the single active context. Not scoped
/// per league and never persisted with durable guarantees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub sort: SortState,
    #[serde(default)]
    pub status_filter: StatusFilter,
    #[serde(default)]
    pub search_filter: String,
}

// ---------------------------------------------------------------------------
// Per-league state
// ---------------------------------------------------------------------------

/// The full mutable draft record for one league.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeagueDraftState {
    pub league_id: String,
    /// Budget the draft started with.
    pub initial_budget: f64,
    /// Remaining budget, set directly by budget updates. Not derived and
    /// not clamped: overspend is representable at this layer.
    pub remaining_budget: f64,
    /// The user's roster slots.
    #[serde(default)]
    pub roster: Roster,
    /// All recorded picks, in insertion order.
    #[serde(default)]
    pub drafted_players: Vec<DraftedPlayer>,
}

impl LeagueDraftState {
    /// Whether a player id has already been recorded in this league.
    pub fn has_player(&self, player_id: &str) -> bool {
        self.drafted_players.iter().any(|p| p.player_id == player_id)
    }
}

// ---------------------------------------------------------------------------
// DraftLedger
// ---------------------------------------------------------------------------

/// Keyed store of league draft states plus the shared view state.
#[derive(Debug, Default)]
pub struct DraftLedger {
    leagues: HashMap<String, LeagueDraftState>,
    view: ViewState,
}

impl DraftLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) the draft state for a league.
    ///
    /// Any existing state under the same id is discarded. Roster slots
    /// are built from the requested counts, capped to the standard
    /// hitter/pitcher sets with an open-ended bench.
    pub fn initialize_draft(
        &mut self,
        league_id: &str,
        initial_budget: f64,
        roster_config: &RosterConfig,
    ) {
        if self.leagues.contains_key(league_id) {
            info!("Re-initializing draft for league {league_id}, discarding prior state");
        }
        let state = LeagueDraftState {
            league_id: league_id.to_string(),
            initial_budget,
            remaining_budget: initial_budget,
            roster: Roster::new(roster_config),
            drafted_players: Vec::new(),
        };
        self.leagues.insert(league_id.to_string(), state);
    }

    /// Look up a league's draft state.
    pub fn get_draft(&self, league_id: &str) -> Option<&LeagueDraftState> {
        self.leagues.get(league_id)
    }

    /// Append a pick to a league's record.
    ///
    /// The ledger assigns `drafted_at` at append time, overwriting
    /// whatever the caller set, so ordering and timestamps come from one
    /// clock. Duplicate player ids are not rejected here; uniqueness is
    /// the reconciliation controller's concern. Unknown league ids are
    /// logged no-ops.
    ///
    /// Returns `true` if the pick was recorded.
    pub fn add_drafted_player(&mut self, league_id: &str, mut pick: DraftedPlayer) -> bool {
        let Some(state) = self.leagues.get_mut(league_id) else {
            warn!("add_drafted_player against unknown league {league_id}, ignoring");
            return false;
        };

        pick.drafted_at = Utc::now();

        if pick.drafted_by == super::player::DraftedBy::User {
            let kind = slot_kind_for_position(&pick.position);
            if !state.roster.assign(&pick.player_id, &pick.position, kind) {
                warn!(
                    "No open roster slot for {} ({}) in league {league_id}",
                    pick.player_name, pick.position
                );
            }
        }

        debug!(
            "League {league_id}: recorded {} for {} (pick #{})",
            pick.player_name,
            pick.purchase_price,
            state.drafted_players.len() + 1
        );
        state.drafted_players.push(pick);
        true
    }

    /// Set a league's remaining budget directly. No clamping or
    /// validation; negative values are allowed. Unknown league: no-op.
    pub fn update_budget(&mut self, league_id: &str, new_remaining: f64) {
        match self.leagues.get_mut(league_id) {
            Some(state) => state.remaining_budget = new_remaining,
            None => warn!("update_budget against unknown league {league_id}, ignoring"),
        }
    }

    /// Remove one league's state. Other leagues are untouched.
    pub fn clear_draft(&mut self, league_id: &str) {
        if self.leagues.remove(league_id).is_some() {
            info!("Cleared draft state for league {league_id}");
        }
    }

    /// Restore a league's state from a persisted snapshot. Partial or
    /// corrupted snapshots come in with per-field defaults already
    /// substituted by the deserializer; this just installs the result.
    pub fn restore_draft(&mut self, state: LeagueDraftState) {
        info!(
            "Restored league {} with {} picks, {} remaining",
            state.league_id,
            state.drafted_players.len(),
            state.remaining_budget
        );
        self.leagues.insert(state.league_id.clone(), state);
    }

    pub fn league_ids(&self) -> Vec<String> {
        self.leagues.keys().cloned().collect()
    }

    // -- view state ---------------------------------------------------------

    pub fn set_sort(&mut self, sort: SortState) {
        self.view.sort = sort;
    }

    pub fn set_status_filter(&mut self, filter: StatusFilter) {
        self.view.status_filter = filter;
    }

    pub fn set_search_filter(&mut self, search: &str) {
        self.view.search_filter = search.to_string();
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// Picks for a league with the current sort and filters applied.
    /// Unknown league yields an empty list.
    pub fn visible_picks(&self, league_id: &str) -> Vec<&DraftedPlayer> {
        let Some(state) = self.leagues.get(league_id) else {
            return Vec::new();
        };

        let search = self.view.search_filter.to_lowercase();
        let mut picks: Vec<&DraftedPlayer> = state
            .drafted_players
            .iter()
            .filter(|p| match self.view.status_filter {
                StatusFilter::All => true,
                StatusFilter::UserTeam => p.drafted_by == super::player::DraftedBy::User,
                StatusFilter::OtherTeams => p.drafted_by == super::player::DraftedBy::Other,
                StatusFilter::ManualOnly => p.is_manual_entry,
            })
            .filter(|p| search.is_empty() || p.player_name.to_lowercase().contains(&search))
            .collect();

        picks.sort_by(|a, b| {
            let ord = match self.view.sort.column {
                SortColumn::DraftedAt => a.drafted_at.cmp(&b.drafted_at),
                SortColumn::Price => a
                    .purchase_price
                    .partial_cmp(&b.purchase_price)
                    .unwrap_or(std::cmp::Ordering::Equal),
                SortColumn::Name => a.player_name.cmp(&b.player_name),
                SortColumn::ProjectedValue => a
                    .projected_value
                    .partial_cmp(&b.projected_value)
                    .unwrap_or(std::cmp::Ordering::Equal),
            };
            match self.view.sort.direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            }
        });

        picks
    }
}
