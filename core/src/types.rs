//! Shared primitive types used across the entire simulation.

/// A currency amount in US dollars.
pub type Dollars = f64;

/// A retention rate expressed as a percentage in [0, 100].
pub type Percent = f64;

/// A rate expressed as a fraction in [0, 1] (CTR, CVR, fill rate).
pub type Ratio = f64;

/// The canonical identifier of a completed campaign in the history store.
pub type CampaignId = String;

/// Divide, yielding 0 when the denominator is zero or the quotient is not finite.
///
/// Every derived metric goes through this so NaN/Infinity never reach a
/// result record.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let q = numerator / denominator;
    if q.is_finite() { q } else { 0.0 }
}

/// Round to two decimal places, the precision every money/ratio display uses.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
