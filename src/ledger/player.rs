// Drafted player records and the read-only projection inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which party a pick was recorded for.
///
/// Provenance is carried for display and auditing only. The Inflation
/// Engine never reads it: identical pick data must produce identical
/// valuations whether it came from the feed or a manual entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftedBy {
    /// The user's own team.
    User,
    /// Any other team in the league.
    Other,
}

impl DraftedBy {
    /// Parse the stored string form ("user"/"other"). Unknown values
    /// default to `Other` so a corrupted row never blocks a restore.
    pub fn from_str_tag(s: &str) -> Self {
        match s {
            "user" => DraftedBy::User,
            _ => DraftedBy::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DraftedBy::User => "user",
            DraftedBy::Other => "other",
        }
    }
}

impl fmt::Display for DraftedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single completed auction purchase.
///
/// Append-only: once recorded in a league's ledger a pick is never
/// mutated in place. `drafted_at` is assigned by the ledger when the
/// pick is appended, so callers don't have to agree on a clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftedPlayer {
    /// External player identifier, intended unique within a league.
    pub player_id: String,
    /// Display name of the player.
    pub player_name: String,
    /// Position string as reported by the projection feed (e.g. "SP", "1B").
    pub position: String,
    /// Winning auction bid.
    pub purchase_price: f64,
    /// Pre-draft projected value at the time of the pick.
    pub projected_value: f64,
    /// Projection variance, carried through for display.
    #[serde(default)]
    pub variance: f64,
    /// Coarse quality bucket, when the projection source provides one.
    #[serde(default)]
    pub tier: Option<u8>,
    /// Whose pick this was.
    pub drafted_by: DraftedBy,
    /// True when the pick was typed in by the user rather than synced
    /// from the draft-room feed.
    #[serde(default)]
    pub is_manual_entry: bool,
    /// Ledger-assigned timestamp of the append.
    pub drafted_at: DateTime<Utc>,
}

/// A pre-draft projection for one player.
///
/// Supplied fresh on every recompute call; the core never caches the
/// projection pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionRecord {
    pub player_id: String,
    pub projected_value: f64,
    pub position: String,
    #[serde(default)]
    pub tier: Option<u8>,
}

impl ProjectionRecord {
    pub fn new(player_id: &str, projected_value: f64, position: &str, tier: Option<u8>) -> Self {
        ProjectionRecord {
            player_id: player_id.to_string(),
            projected_value,
            position: position.to_string(),
            tier,
        }
    }
}

/// Load the projection pool from a JSON array on disk.
pub fn load_projections(path: &std::path::Path) -> anyhow::Result<Vec<ProjectionRecord>> {
    use anyhow::Context;

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read projections file {}", path.display()))?;
    let records: Vec<ProjectionRecord> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse projections file {}", path.display()))?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drafted_by_roundtrip() {
        assert_eq!(DraftedBy::from_str_tag("user"), DraftedBy::User);
        assert_eq!(DraftedBy::from_str_tag("other"), DraftedBy::Other);
        assert_eq!(DraftedBy::User.as_str(), "user");
        assert_eq!(DraftedBy::Other.as_str(), "other");
    }

    #[test]
    fn drafted_by_unknown_defaults_to_other() {
        assert_eq!(DraftedBy::from_str_tag(""), DraftedBy::Other);
        assert_eq!(DraftedBy::from_str_tag("garbage"), DraftedBy::Other);
    }

    #[test]
    fn drafted_by_display() {
        assert_eq!(format!("{}", DraftedBy::User), "user");
        assert_eq!(format!("{}", DraftedBy::Other), "other");
    }

    #[test]
    fn projection_record_new() {
        let rec = ProjectionRecord::new("p1", 32.5, "SS", Some(2));
        assert_eq!(rec.player_id, "p1");
        assert_eq!(rec.projected_value, 32.5);
        assert_eq!(rec.position, "SS");
        assert_eq!(rec.tier, Some(2));
    }

    #[test]
    fn drafted_player_serde_tolerates_missing_optional_fields() {
        // Older persisted rows may lack variance/tier/is_manual_entry.
        let json = r#"{
            "player_id": "p1",
            "player_name": "Mike Trout",
            "position": "CF",
            "purchase_price": 45.0,
            "projected_value": 42.0,
            "drafted_by": "user",
            "drafted_at": "2026-03-01T18:00:00Z"
        }"#;
        let pick: DraftedPlayer = serde_json::from_str(json).unwrap();
        assert_eq!(pick.variance, 0.0);
        assert_eq!(pick.tier, None);
        assert!(!pick.is_manual_entry);
    }

    #[test]
    fn load_projections_from_json_file() {
        let tmp = std::env::temp_dir().join("projections_test_load.json");
        std::fs::write(
            &tmp,
            r#"[
                {"player_id": "p1", "projected_value": 50.0, "position": "1B", "tier": 1},
                {"player_id": "p2", "projected_value": 30.0, "position": "SP"}
            ]"#,
        )
        .unwrap();

        let pool = load_projections(&tmp).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].tier, Some(1));
        assert_eq!(pool[1].tier, None);

        let _ = std::fs::remove_file(&tmp);
    }

    #[test]
    fn load_projections_missing_file_errors() {
        let err = load_projections(std::path::Path::new("/nonexistent/projections.json"))
            .unwrap_err();
        assert!(err.to_string().contains("failed to read projections file"));
    }
}
