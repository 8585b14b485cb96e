//! Metric formula library: one pure function per phase.
//!
//! RULE: These functions never touch `GameState`. They take the phase's
//! strategy inputs, the prior phase's output and the genre bundle, plus an
//! injected `RandomSource`, and return a fresh result record. Variance and
//! market events are layered on afterwards by the engine.
//!
//! Every division goes through `safe_div`, so degenerate inputs (zero
//! budget, empty format list, zero DAU) yield 0 rather than NaN.

use crate::{
    config::{Band, BalanceConfig, RateMultipliers},
    feedback::{select_feedback, FeedbackMetrics},
    genre::GenreMetrics,
    rng::RandomSource,
    state::{AcquisitionResults, MonetizationResults, RetentionRates, RetentionResults},
    strategy::{
        video_share, AgeGroup, BiddingStrategy, CreativeFormat, Interest, MonetizationChoices,
        RetentionChoices,
    },
    types::{safe_div, Dollars},
};
use std::collections::BTreeSet;

fn sample(rng: &mut impl RandomSource, band: Band) -> f64 {
    rng.range(band.min, band.max)
}

// ── Acquisition ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AcquisitionInput<'a> {
    pub budget: Dollars,
    pub age_group: Option<AgeGroup>,
    pub interests: &'a BTreeSet<Interest>,
    pub formats: &'a [CreativeFormat],
    /// `None` prices as a moderate bid.
    pub bidding: Option<BiddingStrategy>,
    pub genre: GenreMetrics,
}

/// Draws: CTR, then CVR.
pub fn simulate_acquisition(
    cfg: &BalanceConfig,
    input: &AcquisitionInput<'_>,
    rng: &mut impl RandomSource,
) -> AcquisitionResults {
    let a = &cfg.acquisition;

    let mut ctr = sample(rng, a.ctr_band);
    let mut cvr = sample(rng, a.cvr_band);

    if video_share(input.formats) >= a.video_share_threshold {
        ctr *= a.video_ctr_bonus;
        cvr *= a.video_cvr_bonus;
    }

    let bid = a.bidding.effect(input.bidding.unwrap_or(BiddingStrategy::Moderate));
    let genre_cpi = input.genre.cpi.min(cfg.genre_caps.max_cpi_modifier);
    let cpi = a.base_cpi
        * a.age_multiplier(input.age_group)
        * a.interest_multiplier(input.interests.iter())
        * genre_cpi
        * bid.cpi;

    ctr = (ctr * bid.ctr).max(a.ctr_floor);

    let installs = if input.budget > 0.0 {
        (safe_div(input.budget, cpi) * ctr * cvr).floor().max(0.0) as u64
    } else {
        0
    };
    let clicks = safe_div(installs as f64, cvr).floor() as u64;
    let impressions = safe_div(clicks as f64, ctr).floor() as u64;

    AcquisitionResults {
        impressions,
        clicks,
        ctr,
        installs,
        cvr,
        cpi,
        spend: input.budget.max(0.0),
    }
}

pub fn acquisition_feedback(
    cfg: &BalanceConfig,
    results: &AcquisitionResults,
    rng: &mut impl RandomSource,
) -> Vec<String> {
    let metrics = FeedbackMetrics {
        ctr: Some(results.ctr),
        cpi: Some(results.cpi),
        cvr: Some(results.cvr),
        ..Default::default()
    };
    select_feedback(&cfg.feedback, &metrics, rng)
}

// ── Retention ──────────────────────────────────────────────────────

/// Deterministic: retention draws nothing.
pub fn simulate_retention(
    cfg: &BalanceConfig,
    installs: u64,
    choices: &RetentionChoices,
    genre: &GenreMetrics,
) -> RetentionResults {
    let r = &cfg.retention;
    let floor = cfg.genre_caps.min_retention_modifier;

    let n = r.notification.get(choices.notification_frequency);
    let c = r.content.get(choices.content_updates);
    let s = if choices.special_events { r.special_events } else { RateMultipliers::IDENTITY };
    let g = RateMultipliers {
        d1: genre.retention.d1.max(floor),
        d7: genre.retention.d7.max(floor),
        d30: genre.retention.d30.max(floor),
    };

    let rate = |base: f64, n: f64, c: f64, s: f64, g: f64| {
        (base * n * c * s * g).clamp(r.floor, r.ceiling)
    };
    let rates = RetentionRates {
        d1: rate(r.base_rates.d1, n.d1, c.d1, s.d1, g.d1),
        d7: rate(r.base_rates.d7, n.d7, c.d7, s.d7, g.d7),
        d30: rate(r.base_rates.d30, n.d30, c.d30, s.d30, g.d30),
    };

    RetentionResults {
        retention_rates: rates,
        dau: dau_for(cfg, installs, rates.d7),
        session_length: session_length(cfg, choices, genre),
    }
}

/// DAU implied by installs and a D7 percentage.
pub fn dau_for(cfg: &BalanceConfig, installs: u64, d7: f64) -> u64 {
    (installs as f64 * (d7 / 100.0) * cfg.retention.dau_bonus).floor().max(0.0) as u64
}

fn session_length(cfg: &BalanceConfig, choices: &RetentionChoices, genre: &GenreMetrics) -> f64 {
    let r = &cfg.retention;
    r.base_session_minutes
        * r.session_content.get(choices.content_updates)
        * r.session_engagement.for_engagement(choices.engagement_spend)
        * genre.session_length.max(cfg.genre_caps.min_session_modifier)
}

pub fn retention_feedback(
    cfg: &BalanceConfig,
    results: &RetentionResults,
    rng: &mut impl RandomSource,
) -> Vec<String> {
    let metrics = FeedbackMetrics {
        d7: Some(results.retention_rates.d7),
        ..Default::default()
    };
    select_feedback(&cfg.feedback, &metrics, rng)
}

// ── Monetization ───────────────────────────────────────────────────

/// Draws: fill rate.
///
/// A DAU of zero is legal: revenue is zero, ARPDAU is zero and the
/// projected ROAS sits at its floor.
pub fn simulate_monetization(
    cfg: &BalanceConfig,
    dau: u64,
    choices: &MonetizationChoices,
    genre: &GenreMetrics,
    rng: &mut impl RandomSource,
) -> MonetizationResults {
    let m = &cfg.monetization;
    let revenue_floor = cfg.genre_caps.min_revenue_modifier;

    let fill_rate = sample(rng, m.fill_rate_band);
    let ecpm = effective_ecpm(cfg, choices);

    let users = dau as f64;
    let impressions = users * m.impressions_per_user.for_frequency(choices.ad_frequency);
    let ad_revenue =
        impressions * fill_rate * (ecpm / 1000.0) * genre.ad_revenue.max(revenue_floor);

    let tier = m.iap.get(choices.iap_pricing);
    let promo = if choices.promotional_offers.enabled() { m.promotion_boost } else { 1.0 };
    let iap_revenue =
        users * tier.conversion * tier.price * promo * genre.iap_revenue.max(revenue_floor);

    let arpdau = safe_div(ad_revenue + iap_revenue, users);

    MonetizationResults {
        arpdau,
        ad_revenue,
        iap_revenue,
        fill_rate,
        ecpm,
        projected_roas: projected_roas(cfg, arpdau),
    }
}

/// Base eCPM compounded by every selected ad format and the frequency tier.
pub fn effective_ecpm(cfg: &BalanceConfig, choices: &MonetizationChoices) -> f64 {
    let m = &cfg.monetization;
    let formats: f64 = choices
        .ad_formats
        .iter()
        .map(|f| m.ad_format_ecpm.get(*f))
        .product();
    m.base_ecpm * formats * m.frequency_ecpm.for_frequency(choices.ad_frequency)
}

pub fn projected_roas(cfg: &BalanceConfig, arpdau: f64) -> f64 {
    let m = &cfg.monetization;
    (arpdau * safe_div(m.roas_horizon_days, cfg.acquisition.base_cpi)).max(m.roas_floor)
}

pub fn monetization_feedback(
    cfg: &BalanceConfig,
    results: &MonetizationResults,
    rng: &mut impl RandomSource,
) -> Vec<String> {
    let metrics = FeedbackMetrics {
        arpdau: Some(results.arpdau),
        roas: Some(results.projected_roas),
        ..Default::default()
    };
    select_feedback(&cfg.feedback, &metrics, rng)
}
