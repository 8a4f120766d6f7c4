// SQLite persistence for draft picks and key-value sync state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::warn;

use crate::ledger::player::{DraftedBy, DraftedPlayer};

/// SQLite-backed store for draft picks and arbitrary JSON state blobs.
///
/// Durable-storage guarantees live here, not in the ledger: the ledger
/// only promises that whatever this store hands back can be installed,
/// substituting defaults for anything corrupted or missing.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at `path` and ensure the schema
    /// exists. Pass `":memory:"` for an ephemeral database in tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS draft_picks (
                league_id       TEXT NOT NULL,
                player_id       TEXT NOT NULL,
                player_name     TEXT NOT NULL,
                position        TEXT NOT NULL,
                purchase_price  REAL NOT NULL,
                projected_value REAL NOT NULL,
                variance        REAL NOT NULL DEFAULT 0,
                tier            INTEGER,
                drafted_by      TEXT NOT NULL,
                is_manual_entry INTEGER NOT NULL DEFAULT 0,
                drafted_at      TEXT NOT NULL,
                PRIMARY KEY (league_id, player_id)
            );

            CREATE TABLE IF NOT EXISTS sync_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Record a pick. INSERT OR IGNORE keeps re-recording the same
    /// (league, player) pair idempotent.
    pub fn record_pick(&self, league_id: &str, pick: &DraftedPlayer) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO draft_picks
                (league_id, player_id, player_name, position, purchase_price,
                 projected_value, variance, tier, drafted_by, is_manual_entry, drafted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                league_id,
                pick.player_id,
                pick.player_name,
                pick.position,
                pick.purchase_price,
                pick.projected_value,
                pick.variance,
                pick.tier,
                pick.drafted_by.as_str(),
                pick.is_manual_entry as i64,
                pick.drafted_at.to_rfc3339(),
            ],
        )
        .context("failed to record draft pick")?;
        Ok(())
    }

    /// Load a league's picks in insertion order.
    ///
    /// Malformed stored fields fall back to defaults rather than
    /// failing the whole load: a bad timestamp becomes "now", an
    /// unknown provenance tag becomes `other`.
    pub fn load_picks(&self, league_id: &str) -> Result<Vec<DraftedPlayer>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player_id, player_name, position, purchase_price, projected_value,
                        variance, tier, drafted_by, is_manual_entry, drafted_at
                 FROM draft_picks WHERE league_id = ?1 ORDER BY rowid",
            )
            .context("failed to prepare load_picks query")?;

        let picks = stmt
            .query_map(params![league_id], |row| {
                let drafted_by: String = row.get(7)?;
                let drafted_at: String = row.get(9)?;
                let drafted_at = DateTime::parse_from_rfc3339(&drafted_at)
                    .map(|d| d.with_timezone(&Utc))
                    .unwrap_or_else(|_| {
                        warn!("Unparseable drafted_at for a stored pick, substituting now");
                        Utc::now()
                    });
                Ok(DraftedPlayer {
                    player_id: row.get(0)?,
                    player_name: row.get(1)?,
                    position: row.get(2)?,
                    purchase_price: row.get(3)?,
                    projected_value: row.get(4)?,
                    variance: row.get::<_, Option<f64>>(5)?.unwrap_or_default(),
                    tier: row.get::<_, Option<u8>>(6)?,
                    drafted_by: DraftedBy::from_str_tag(&drafted_by),
                    is_manual_entry: row.get::<_, i64>(8)? != 0,
                    drafted_at,
                })
            })
            .context("failed to query draft picks")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map draft pick rows")?;

        Ok(picks)
    }

    /// Delete one league's picks.
    pub fn clear_picks(&self, league_id: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM draft_picks WHERE league_id = ?1",
            params![league_id],
        )
        .context("failed to clear draft picks")?;
        Ok(())
    }

    /// Persist an arbitrary JSON value under `key`. INSERT OR REPLACE so
    /// repeated saves overwrite the previous value.
    pub fn save_state(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str = serde_json::to_string(value).context("failed to serialize state value")?;
        conn.execute(
            "INSERT OR REPLACE INTO sync_state (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save state")?;
        Ok(())
    }

    /// Load a previously saved JSON value. `None` when the key does not
    /// exist; `None` with a warning when the stored blob is corrupt.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM sync_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;

        let mut rows = stmt.query(params![key]).context("failed to query state")?;

        match rows.next().context("failed to read state row")? {
            Some(row) => {
                let json_str: String = row.get(0).context("failed to get state value")?;
                match serde_json::from_str(&json_str) {
                    Ok(value) => Ok(Some(value)),
                    Err(e) => {
                        warn!("Corrupt state blob under key '{key}': {e}, ignoring");
                        Ok(None)
                    }
                }
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pick(player_id: &str, price: f64) -> DraftedPlayer {
        DraftedPlayer {
            player_id: player_id.to_string(),
            player_name: format!("Player {player_id}"),
            position: "SS".to_string(),
            purchase_price: price,
            projected_value: price - 2.0,
            variance: 1.5,
            tier: Some(2),
            drafted_by: DraftedBy::User,
            is_manual_entry: true,
            drafted_at: Utc::now(),
        }
    }

    #[test]
    fn record_and_load_roundtrip() {
        let db = Database::open(":memory:").unwrap();
        db.record_pick("L1", &make_pick("p1", 45.0)).unwrap();
        db.record_pick("L1", &make_pick("p2", 30.0)).unwrap();

        let picks = db.load_picks("L1").unwrap();
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].player_id, "p1");
        assert_eq!(picks[0].purchase_price, 45.0);
        assert_eq!(picks[0].tier, Some(2));
        assert_eq!(picks[0].drafted_by, DraftedBy::User);
        assert!(picks[0].is_manual_entry);
        assert_eq!(picks[1].player_id, "p2");
    }

    #[test]
    fn picks_are_scoped_by_league() {
        let db = Database::open(":memory:").unwrap();
        db.record_pick("L1", &make_pick("p1", 45.0)).unwrap();
        db.record_pick("L2", &make_pick("p2", 30.0)).unwrap();

        assert_eq!(db.load_picks("L1").unwrap().len(), 1);
        assert_eq!(db.load_picks("L2").unwrap().len(), 1);
        assert!(db.load_picks("L3").unwrap().is_empty());
    }

    #[test]
    fn record_pick_is_idempotent() {
        let db = Database::open(":memory:").unwrap();
        db.record_pick("L1", &make_pick("p1", 45.0)).unwrap();
        db.record_pick("L1", &make_pick("p1", 99.0)).unwrap();

        let picks = db.load_picks("L1").unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].purchase_price, 45.0);
    }

    #[test]
    fn clear_picks_removes_only_that_league() {
        let db = Database::open(":memory:").unwrap();
        db.record_pick("L1", &make_pick("p1", 45.0)).unwrap();
        db.record_pick("L2", &make_pick("p2", 30.0)).unwrap();
        db.clear_picks("L1").unwrap();

        assert!(db.load_picks("L1").unwrap().is_empty());
        assert_eq!(db.load_picks("L2").unwrap().len(), 1);
    }

    #[test]
    fn state_roundtrip() {
        let db = Database::open(":memory:").unwrap();
        let value = serde_json::json!({ "remaining_budget": 215.0 });
        db.save_state("budget:L1", &value).unwrap();

        let loaded = db.load_state("budget:L1").unwrap().unwrap();
        assert_eq!(loaded["remaining_budget"], 215.0);
        assert!(db.load_state("budget:L2").unwrap().is_none());
    }

    #[test]
    fn corrupt_state_blob_loads_as_none() {
        let db = Database::open(":memory:").unwrap();
        {
            let conn = db.conn();
            conn.execute(
                "INSERT INTO sync_state (key, value) VALUES ('bad', '{not json')",
                [],
            )
            .unwrap();
        }
        assert!(db.load_state("bad").unwrap().is_none());
    }

    #[test]
    fn malformed_timestamp_falls_back_to_now() {
        let db = Database::open(":memory:").unwrap();
        db.record_pick("L1", &make_pick("p1", 45.0)).unwrap();
        {
            let conn = db.conn();
            conn.execute("UPDATE draft_picks SET drafted_at = 'not a timestamp'", [])
                .unwrap();
        }
        let picks = db.load_picks("L1").unwrap();
        assert_eq!(picks.len(), 1); // still loads, with a substituted time
    }
}
