// Draft ledger: authoritative per-league record of budget, roster, and picks.

pub mod player;
pub mod roster;
pub mod store;

pub use player::{load_projections, DraftedBy, DraftedPlayer, ProjectionRecord};
pub use roster::{Roster, RosterConfig};
pub use store::{DraftLedger, LeagueDraftState, SortColumn, SortDirection, SortState, StatusFilter};
