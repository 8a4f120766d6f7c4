// Valuation engine: inflation rates, adjusted values, price verdicts.

pub mod classify;
pub mod inflation;

pub use classify::{classify, percent_diff, PriceVerdict};
pub use inflation::{recompute, InflationState};
