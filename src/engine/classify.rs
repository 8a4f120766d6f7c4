// Price classification against inflation-adjusted value.
//
// Pure functions: compare an actual purchase price to a player's
// adjusted value and bucket the result as a steal, fair price, or
// overpay using a +/-10% band.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Percent difference beyond which a price counts as a steal (below)
/// or an overpay (above). The band is inclusive: exactly +/-10% is fair.
pub const FAIR_BAND_PCT: f64 = 10.0;

/// The verdict on a purchase price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceVerdict {
    Steal,
    Fair,
    Overpay,
    /// No price available to judge.
    None,
}

impl fmt::Display for PriceVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriceVerdict::Steal => "steal",
            PriceVerdict::Fair => "fair",
            PriceVerdict::Overpay => "overpay",
            PriceVerdict::None => "none",
        };
        write!(f, "{s}")
    }
}

/// Signed percent difference of `actual` versus `adjusted`.
///
/// The zero-denominator case resolves without dividing: a positive
/// price against a $0 value reads as +100% (a pure overpay), and $0
/// against $0 reads as 0% (fair).
pub fn percent_diff(actual: f64, adjusted: f64) -> f64 {
    if adjusted == 0.0 {
        if actual > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (actual - adjusted) / adjusted * 100.0
    }
}

/// Classify a purchase price against an adjusted value.
///
/// A missing price yields `PriceVerdict::None`. Otherwise the percent
/// difference is bucketed: below -10% steal, above +10% overpay,
/// anything in between (boundaries included) fair.
pub fn classify(actual: Option<f64>, adjusted: f64) -> PriceVerdict {
    let Some(actual) = actual else {
        return PriceVerdict::None;
    };

    let diff = percent_diff(actual, adjusted);
    if diff < -FAIR_BAND_PCT {
        PriceVerdict::Steal
    } else if diff > FAIR_BAND_PCT {
        PriceVerdict::Overpay
    } else {
        PriceVerdict::Fair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_price_is_none() {
        assert_eq!(classify(None, 50.0), PriceVerdict::None);
        assert_eq!(classify(None, 0.0), PriceVerdict::None);
    }

    #[test]
    fn representative_prices() {
        assert_eq!(classify(Some(45.0), 50.0), PriceVerdict::Fair);
        assert_eq!(classify(Some(44.5), 50.0), PriceVerdict::Steal);
        assert_eq!(classify(Some(55.5), 50.0), PriceVerdict::Overpay);
    }

    #[test]
    fn band_is_boundary_inclusive() {
        // Exactly +/-10% is fair; a hair past is not.
        assert_eq!(classify(Some(55.0), 50.0), PriceVerdict::Fair); // +10.0%
        assert_eq!(classify(Some(45.0), 50.0), PriceVerdict::Fair); // -10.0%
        assert_eq!(classify(Some(55.000_05), 50.0), PriceVerdict::Overpay); // +10.0001%
        assert_eq!(classify(Some(44.999_95), 50.0), PriceVerdict::Steal); // -10.0001%
    }

    #[test]
    fn zero_adjusted_value() {
        assert_eq!(percent_diff(5.0, 0.0), 100.0);
        assert_eq!(percent_diff(0.0, 0.0), 0.0);
        assert_eq!(classify(Some(5.0), 0.0), PriceVerdict::Overpay);
        assert_eq!(classify(Some(0.0), 0.0), PriceVerdict::Fair);
    }

    #[test]
    fn percent_diff_signed() {
        assert_eq!(percent_diff(55.0, 50.0), 10.0);
        assert_eq!(percent_diff(45.0, 50.0), -10.0);
        assert_eq!(percent_diff(50.0, 50.0), 0.0);
        assert!((percent_diff(60.0, 40.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn deep_discounts_and_blowouts() {
        assert_eq!(classify(Some(1.0), 50.0), PriceVerdict::Steal);
        assert_eq!(classify(Some(200.0), 50.0), PriceVerdict::Overpay);
    }

    #[test]
    fn verdict_display() {
        assert_eq!(format!("{}", PriceVerdict::Steal), "steal");
        assert_eq!(format!("{}", PriceVerdict::Fair), "fair");
        assert_eq!(format!("{}", PriceVerdict::Overpay), "overpay");
        assert_eq!(format!("{}", PriceVerdict::None), "none");
    }
}
