// Roster slot construction and placement.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Standard slot sets
// ---------------------------------------------------------------------------

/// Fixed hitter slot labels, in display order. A league asking for more
/// hitter slots than this set provides is capped to the set.
pub const STANDARD_HITTER_SLOTS: [&str; 14] = [
    "C", "1B", "2B", "3B", "SS", "LF", "CF", "RF", "OF", "OF", "MI", "CI", "DH", "UTIL",
];

/// Fixed pitcher slot labels, in display order. Capped the same way.
pub const STANDARD_PITCHER_SLOTS: [&str; 9] =
    ["SP", "SP", "SP", "SP", "SP", "RP", "RP", "RP", "P"];

/// Broad slot category. Bench is the only uncapped category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Hitter,
    Pitcher,
    Bench,
}

/// Requested slot counts per category, from league config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterConfig {
    pub hitters: usize,
    pub pitchers: usize,
    pub bench: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        RosterConfig {
            hitters: STANDARD_HITTER_SLOTS.len(),
            pitchers: STANDARD_PITCHER_SLOTS.len(),
            bench: 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// A single slot on the user's roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterSlot {
    /// Slot label (e.g. "SS", "SP", "BE").
    pub label: String,
    pub kind: SlotKind,
    /// Occupying player id, if filled.
    pub player_id: Option<String>,
}

/// The user's complete roster of slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Roster {
    pub slots: Vec<RosterSlot>,
}

impl Roster {
    /// Build the slot list from requested counts.
    ///
    /// Hitter and pitcher counts are capped to the standard slot sets;
    /// bench slots are open-ended.
    pub fn new(config: &RosterConfig) -> Self {
        let mut slots = Vec::new();

        let hitter_count = config.hitters.min(STANDARD_HITTER_SLOTS.len());
        for label in STANDARD_HITTER_SLOTS.iter().take(hitter_count) {
            slots.push(RosterSlot {
                label: (*label).to_string(),
                kind: SlotKind::Hitter,
                player_id: None,
            });
        }

        let pitcher_count = config.pitchers.min(STANDARD_PITCHER_SLOTS.len());
        for label in STANDARD_PITCHER_SLOTS.iter().take(pitcher_count) {
            slots.push(RosterSlot {
                label: (*label).to_string(),
                kind: SlotKind::Pitcher,
                player_id: None,
            });
        }

        for _ in 0..config.bench {
            slots.push(RosterSlot {
                label: "BE".to_string(),
                kind: SlotKind::Bench,
                player_id: None,
            });
        }

        Roster { slots }
    }

    /// Place a player on the roster.
    ///
    /// Priority: exact label match, then any open slot of the matching
    /// category, then bench. Returns `false` if every candidate slot is
    /// taken; the ledger records the pick either way.
    pub fn assign(&mut self, player_id: &str, position: &str, kind: SlotKind) -> bool {
        let upper = position.to_uppercase();

        // 1. Dedicated slot for the exact position label.
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.label == upper && s.player_id.is_none())
        {
            slot.player_id = Some(player_id.to_string());
            return true;
        }

        // 2. Any open slot in the same category (UTIL, OF, MI, generic P...).
        if kind != SlotKind::Bench {
            if let Some(slot) = self
                .slots
                .iter_mut()
                .find(|s| s.kind == kind && s.player_id.is_none())
            {
                slot.player_id = Some(player_id.to_string());
                return true;
            }
        }

        // 3. Bench.
        if let Some(slot) = self
            .slots
            .iter_mut()
            .find(|s| s.kind == SlotKind::Bench && s.player_id.is_none())
        {
            slot.player_id = Some(player_id.to_string());
            return true;
        }

        false
    }

    /// Number of filled slots.
    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.player_id.is_some()).count()
    }

    /// Number of open slots.
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|s| s.player_id.is_none()).count()
    }
}

/// Whether a position string names a pitching position.
pub fn is_pitcher_position(position: &str) -> bool {
    matches!(position.to_uppercase().as_str(), "SP" | "RP" | "P")
}

/// Map a position string to the slot category used for placement.
pub fn slot_kind_for_position(position: &str) -> SlotKind {
    if is_pitcher_position(position) {
        SlotKind::Pitcher
    } else {
        SlotKind::Hitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_config() -> RosterConfig {
        RosterConfig {
            hitters: 14,
            pitchers: 9,
            bench: 3,
        }
    }

    #[test]
    fn roster_builds_requested_counts() {
        let roster = Roster::new(&standard_config());
        assert_eq!(roster.slots.len(), 26);
        assert_eq!(
            roster.slots.iter().filter(|s| s.kind == SlotKind::Hitter).count(),
            14
        );
        assert_eq!(
            roster.slots.iter().filter(|s| s.kind == SlotKind::Pitcher).count(),
            9
        );
        assert_eq!(
            roster.slots.iter().filter(|s| s.kind == SlotKind::Bench).count(),
            3
        );
    }

    #[test]
    fn hitter_and_pitcher_counts_are_capped() {
        let roster = Roster::new(&RosterConfig {
            hitters: 40,
            pitchers: 40,
            bench: 2,
        });
        assert_eq!(
            roster.slots.iter().filter(|s| s.kind == SlotKind::Hitter).count(),
            STANDARD_HITTER_SLOTS.len()
        );
        assert_eq!(
            roster.slots.iter().filter(|s| s.kind == SlotKind::Pitcher).count(),
            STANDARD_PITCHER_SLOTS.len()
        );
    }

    #[test]
    fn bench_is_uncapped() {
        let roster = Roster::new(&RosterConfig {
            hitters: 2,
            pitchers: 2,
            bench: 50,
        });
        assert_eq!(
            roster.slots.iter().filter(|s| s.kind == SlotKind::Bench).count(),
            50
        );
    }

    #[test]
    fn assign_prefers_dedicated_slot() {
        let mut roster = Roster::new(&standard_config());
        assert!(roster.assign("p1", "SS", SlotKind::Hitter));
        let ss = roster.slots.iter().find(|s| s.label == "SS").unwrap();
        assert_eq!(ss.player_id.as_deref(), Some("p1"));
    }

    #[test]
    fn assign_falls_through_to_category_then_bench() {
        let mut roster = Roster::new(&RosterConfig {
            hitters: 1, // only "C"
            pitchers: 1,
            bench: 1,
        });
        // No SS slot exists; the hitter category slot "C" absorbs the first,
        // bench the second, and the third has nowhere to go.
        assert!(roster.assign("p1", "SS", SlotKind::Hitter));
        assert!(roster.assign("p2", "SS", SlotKind::Hitter));
        assert!(!roster.assign("p3", "SS", SlotKind::Hitter));
        assert_eq!(roster.filled_count(), 2);
    }

    #[test]
    fn assign_is_case_insensitive() {
        let mut roster = Roster::new(&standard_config());
        assert!(roster.assign("p1", "ss", SlotKind::Hitter));
        let ss = roster.slots.iter().find(|s| s.label == "SS").unwrap();
        assert_eq!(ss.player_id.as_deref(), Some("p1"));
    }

    #[test]
    fn open_count_tracks_assignments() {
        let mut roster = Roster::new(&standard_config());
        assert_eq!(roster.open_count(), 26);
        roster.assign("p1", "C", SlotKind::Hitter);
        roster.assign("p2", "SP", SlotKind::Pitcher);
        assert_eq!(roster.open_count(), 24);
        assert_eq!(roster.filled_count(), 2);
    }

    #[test]
    fn pitcher_position_detection() {
        assert!(is_pitcher_position("SP"));
        assert!(is_pitcher_position("rp"));
        assert!(is_pitcher_position("P"));
        assert!(!is_pitcher_position("SS"));
        assert!(!is_pitcher_position("UTIL"));
        assert_eq!(slot_kind_for_position("SP"), SlotKind::Pitcher);
        assert_eq!(slot_kind_for_position("1B"), SlotKind::Hitter);
    }
}
