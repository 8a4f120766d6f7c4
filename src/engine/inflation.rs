// Inflation recomputation over the current picks and projection pool.
//
// By comparing actual spend against projected value we can tell whether
// the league is overpaying (inflation) or underpaying (deflation)
// relative to pre-draft projections, and rescale the remaining pool
// accordingly. The whole state is recomputed from scratch on every
// call: recompute cost is traded for correctness simplicity, and at
// realistic sizes (hundreds of picks, 500+ projections) a full pass is
// far below a millisecond.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ledger::player::{DraftedPlayer, ProjectionRecord};

/// Snapshot of inflation rates and adjusted values at one point in the
/// draft. Rebuilt wholesale by `recompute`; never updated incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InflationState {
    /// League-wide inflation rate as a signed fraction. 0.10 means the
    /// league is paying 10% over projection; negative means deflation.
    pub overall_rate: f64,
    /// Per-position rates, advisory only. Keyed by position string.
    pub position_rates: HashMap<String, f64>,
    /// Per-tier rates, advisory only.
    pub tier_rates: HashMap<u8, f64>,
    /// Overall-rate-adjusted values for every UNDRAFTED player in the
    /// projection pool. Drafted players have no entry.
    pub adjusted_values: HashMap<String, f64>,
    /// Count of undrafted players in the pool.
    pub players_remaining: usize,
    pub last_updated: DateTime<Utc>,
    /// Populated by callers when a recompute had to be skipped; the
    /// engine itself always succeeds.
    pub error: Option<String>,
}

impl Default for InflationState {
    fn default() -> Self {
        InflationState {
            overall_rate: 0.0,
            position_rates: HashMap::new(),
            tier_rates: HashMap::new(),
            adjusted_values: HashMap::new(),
            players_remaining: 0,
            last_updated: Utc::now(),
            error: None,
        }
    }
}

impl InflationState {
    /// Adjusted value for a player, if undrafted and in the pool.
    pub fn adjusted_value(&self, player_id: &str) -> Option<f64> {
        self.adjusted_values.get(player_id).copied()
    }
}

/// Spend-versus-projection rate for one group of picks.
///
/// `(total spent - total projected) / total projected`, with the
/// zero-denominator (and empty-group) case resolving to 0 rather than
/// raising. Rates are signed: negative means the group went below
/// projection.
fn spend_rate<'a, I>(picks: I) -> f64
where
    I: Iterator<Item = &'a DraftedPlayer>,
{
    let (mut spent, mut projected) = (0.0, 0.0);
    for pick in picks {
        spent += pick.purchase_price;
        projected += pick.projected_value;
    }
    if projected == 0.0 {
        0.0
    } else {
        (spent - projected) / projected
    }
}

/// Recompute the full inflation state from the current picks and the
/// complete projection pool.
///
/// The computation reads only price, projected value, position, tier,
/// and player id from each pick. Provenance fields (`drafted_by`,
/// `is_manual_entry`) are deliberately never consulted: identical pick
/// data yields identical output no matter how the picks arrived.
///
/// Position and tier rates are advisory breakdowns. The adjusted value
/// used for price classification is scaled by the overall rate only,
/// never compounded with a player's own position or tier rate.
pub fn recompute(picks: &[DraftedPlayer], projections: &[ProjectionRecord]) -> InflationState {
    let overall_rate = spend_rate(picks.iter());

    // Group rates restricted to picks matching each position/tier seen
    // among the picks. Groups with no matching picks simply don't appear;
    // a group whose projections sum to zero reads as rate 0.
    let mut position_rates: HashMap<String, f64> = HashMap::new();
    let mut tier_rates: HashMap<u8, f64> = HashMap::new();

    for pick in picks {
        position_rates
            .entry(pick.position.clone())
            .or_insert_with(|| spend_rate(picks.iter().filter(|p| p.position == pick.position)));
        if let Some(tier) = pick.tier {
            tier_rates
                .entry(tier)
                .or_insert_with(|| spend_rate(picks.iter().filter(|p| p.tier == Some(tier))));
        }
    }

    // Forward values: every undrafted player in the pool gets its
    // projection rescaled by (1 + overall rate). Drafted players get no
    // entry at all.
    let drafted_ids: HashSet<&str> = picks.iter().map(|p| p.player_id.as_str()).collect();
    let mut adjusted_values = HashMap::new();
    for proj in projections {
        if !drafted_ids.contains(proj.player_id.as_str()) {
            adjusted_values.insert(
                proj.player_id.clone(),
                proj.projected_value * (1.0 + overall_rate),
            );
        }
    }
    let players_remaining = adjusted_values.len();

    InflationState {
        overall_rate,
        position_rates,
        tier_rates,
        adjusted_values,
        players_remaining,
        last_updated: Utc::now(),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::player::DraftedBy;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn make_pick(
        player_id: &str,
        position: &str,
        tier: Option<u8>,
        price: f64,
        projected: f64,
    ) -> DraftedPlayer {
        DraftedPlayer {
            player_id: player_id.to_string(),
            player_name: format!("Player {player_id}"),
            position: position.to_string(),
            purchase_price: price,
            projected_value: projected,
            variance: 0.0,
            tier,
            drafted_by: DraftedBy::Other,
            is_manual_entry: false,
            drafted_at: Utc::now(),
        }
    }

    fn pool() -> Vec<ProjectionRecord> {
        vec![
            ProjectionRecord::new("p1", 50.0, "1B", Some(1)),
            ProjectionRecord::new("p2", 30.0, "SP", Some(1)),
            ProjectionRecord::new("p3", 20.0, "SS", Some(2)),
            ProjectionRecord::new("p4", 10.0, "RP", Some(3)),
        ]
    }

    #[test]
    fn empty_picks_is_flat() {
        let state = recompute(&[], &pool());
        assert_eq!(state.overall_rate, 0.0);
        assert!(state.position_rates.is_empty());
        assert!(state.tier_rates.is_empty());
        assert_eq!(state.players_remaining, 4);
        // With zero inflation, adjusted values equal raw projections.
        assert!(approx_eq(state.adjusted_value("p1").unwrap(), 50.0));
        assert!(approx_eq(state.adjusted_value("p4").unwrap(), 10.0));
    }

    #[test]
    fn single_pick_overall_rate() {
        // 55 paid on a 50 projection -> 10% inflation.
        let picks = vec![make_pick("p1", "1B", Some(1), 55.0, 50.0)];
        let state = recompute(&picks, &pool());
        assert!(approx_eq(state.overall_rate, 0.10));
    }

    #[test]
    fn two_pick_overall_rate() {
        // (55+35 - 50-30) / 80 = 10/80 = 0.125
        let picks = vec![
            make_pick("p1", "1B", Some(1), 55.0, 50.0),
            make_pick("p2", "SP", Some(1), 35.0, 30.0),
        ];
        let state = recompute(&picks, &pool());
        assert!(approx_eq(state.overall_rate, 0.125));
    }

    #[test]
    fn deflation_is_negative() {
        let picks = vec![make_pick("p1", "1B", Some(1), 40.0, 50.0)];
        let state = recompute(&picks, &pool());
        assert!(approx_eq(state.overall_rate, -0.2));
        // Adjusted values shrink with the pool.
        assert!(approx_eq(state.adjusted_value("p3").unwrap(), 16.0));
    }

    #[test]
    fn position_and_tier_breakdowns() {
        let picks = vec![
            make_pick("p1", "1B", Some(1), 55.0, 50.0), // 1B: +10%
            make_pick("p2", "SP", Some(1), 24.0, 30.0), // SP: -20%
            make_pick("p3", "SS", Some(2), 20.0, 20.0), // SS: 0%
        ];
        let state = recompute(&picks, &pool());

        assert!(approx_eq(state.position_rates["1B"], 0.10));
        assert!(approx_eq(state.position_rates["SP"], -0.20));
        assert!(approx_eq(state.position_rates["SS"], 0.0));
        assert!(state.position_rates.get("RP").is_none());

        // Tier 1 pooled: (55+24 - 80)/80 = -1/80
        assert!(approx_eq(state.tier_rates[&1], -1.0 / 80.0));
        assert!(approx_eq(state.tier_rates[&2], 0.0));
        assert!(state.tier_rates.get(&3).is_none());
    }

    #[test]
    fn adjusted_values_use_overall_rate_only() {
        // SP ran 50% hot, but the undrafted SP must be adjusted by the
        // overall rate, not its position rate.
        let picks = vec![
            make_pick("p1", "SP", None, 30.0, 20.0),  // SP +50%
            make_pick("p3", "SS", None, 20.0, 20.0), // SS flat
        ];
        let state = recompute(&picks, &pool());
        // overall = (50 - 40)/40 = 0.25
        assert!(approx_eq(state.overall_rate, 0.25));
        // Undrafted SP "p2": 30 * 1.25 = 37.5, NOT 30 * 1.5.
        assert!(approx_eq(state.adjusted_value("p2").unwrap(), 37.5));
    }

    #[test]
    fn drafted_players_have_no_adjusted_entry() {
        let picks = vec![make_pick("p1", "1B", Some(1), 55.0, 50.0)];
        let state = recompute(&picks, &pool());
        assert!(state.adjusted_value("p1").is_none());
        assert_eq!(state.players_remaining, 3);
    }

    #[test]
    fn zero_projection_denominators_resolve_to_zero() {
        // Every projected value zero: no division, no panic.
        let picks = vec![
            make_pick("p1", "1B", Some(1), 10.0, 0.0),
            make_pick("p2", "1B", Some(1), 5.0, 0.0),
        ];
        let state = recompute(&picks, &pool());
        assert_eq!(state.overall_rate, 0.0);
        assert_eq!(state.position_rates["1B"], 0.0);
        assert_eq!(state.tier_rates[&1], 0.0);
    }

    #[test]
    fn provenance_never_changes_output() {
        // The central correctness property: identical pick data must
        // yield identical output regardless of how each pick arrived.
        let feed_picks = vec![
            make_pick("p1", "1B", Some(1), 55.0, 50.0),
            make_pick("p2", "SP", Some(1), 35.0, 30.0),
        ];
        let mut manual_picks = feed_picks.clone();
        for (i, pick) in manual_picks.iter_mut().enumerate() {
            pick.is_manual_entry = true;
            pick.drafted_by = if i % 2 == 0 {
                DraftedBy::User
            } else {
                DraftedBy::Other
            };
        }

        let a = recompute(&feed_picks, &pool());
        let b = recompute(&manual_picks, &pool());

        assert_eq!(a.overall_rate, b.overall_rate);
        assert_eq!(a.position_rates, b.position_rates);
        assert_eq!(a.tier_rates, b.tier_rates);
        assert_eq!(a.adjusted_values, b.adjusted_values);
        assert_eq!(a.players_remaining, b.players_remaining);
    }

    #[test]
    fn full_recompute_is_fast_at_realistic_sizes() {
        let picks: Vec<DraftedPlayer> = (0..300)
            .map(|i| {
                make_pick(
                    &format!("d{i}"),
                    if i % 2 == 0 { "SP" } else { "SS" },
                    Some((i % 5) as u8),
                    (i % 60) as f64 + 1.0,
                    (i % 55) as f64 + 1.0,
                )
            })
            .collect();
        let projections: Vec<ProjectionRecord> = (0..600)
            .map(|i| ProjectionRecord::new(&format!("u{i}"), (i % 40) as f64, "OF", Some(1)))
            .collect();

        let start = std::time::Instant::now();
        let state = recompute(&picks, &projections);
        assert!(start.elapsed().as_secs() < 1);
        assert_eq!(state.players_remaining, 600);
    }
}
