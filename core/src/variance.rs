//! Continuous variance: `value × (1 ± U[min, max))`, sign by fair coin.
//!
//! The engine applies variance to the primary output of each phase and then
//! recomputes the metrics that depend on it, so a perturbed record stays
//! internally consistent (installs → clicks → impressions, DAU, ARPDAU).

use crate::{
    config::{BalanceConfig, VarianceBalance},
    formulas::projected_roas,
    rng::RandomSource,
    state::{AcquisitionResults, MonetizationResults, RetentionResults},
    types::safe_div,
};

/// The multiplier for one perturbation. Draws: magnitude, then sign.
pub fn variance_multiplier(cfg: &VarianceBalance, rng: &mut impl RandomSource) -> f64 {
    let magnitude = rng.range(cfg.magnitude.min, cfg.magnitude.max);
    if rng.coin() { 1.0 + magnitude } else { 1.0 - magnitude }
}

pub fn apply_variance(value: f64, cfg: &VarianceBalance, rng: &mut impl RandomSource) -> f64 {
    value * variance_multiplier(cfg, rng)
}

fn perturb_count(count: u64, cfg: &VarianceBalance, rng: &mut impl RandomSource) -> u64 {
    apply_variance(count as f64, cfg, rng).floor().max(0.0) as u64
}

/// Perturb installs; clicks and impressions follow.
pub fn perturb_acquisition(
    cfg: &BalanceConfig,
    results: &mut AcquisitionResults,
    rng: &mut impl RandomSource,
) {
    if !cfg.variance.enabled {
        return;
    }
    results.installs = perturb_count(results.installs, &cfg.variance, rng);
    results.clicks = safe_div(results.installs as f64, results.cvr).floor() as u64;
    results.impressions = safe_div(results.clicks as f64, results.ctr).floor() as u64;
}

/// Perturb DAU only; retention rates are already clamped and stay put.
pub fn perturb_retention(
    cfg: &BalanceConfig,
    results: &mut RetentionResults,
    rng: &mut impl RandomSource,
) {
    if !cfg.variance.enabled {
        return;
    }
    results.dau = perturb_count(results.dau, &cfg.variance, rng);
}

/// Perturb ad and IAP revenue independently; ARPDAU and ROAS follow.
pub fn perturb_monetization(
    cfg: &BalanceConfig,
    results: &mut MonetizationResults,
    dau: u64,
    rng: &mut impl RandomSource,
) {
    if !cfg.variance.enabled {
        return;
    }
    results.ad_revenue = apply_variance(results.ad_revenue, &cfg.variance, rng);
    results.iap_revenue = apply_variance(results.iap_revenue, &cfg.variance, rng);
    results.arpdau = safe_div(results.ad_revenue + results.iap_revenue, dau as f64);
    results.projected_roas = projected_roas(cfg, results.arpdau);
}
