//! Discrete market events: named, one-shot multiplicative shocks.
//!
//! RULE: An event id is shown at most once per session, and at most
//! `events.max_per_session` events are shown in total. An applied impact is
//! permanent; nothing reverts it.
//!
//! Each impact names one field and the engine recomputes the fields that
//! derive from it (e.g. more installs on the same clicks means a higher CVR).

use crate::{
    config::BalanceConfig,
    formulas::projected_roas,
    rng::RandomSource,
    state::{AcquisitionResults, MonetizationResults, Phase, RetentionResults},
    types::safe_div,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcquisitionImpact {
    /// Scale installs; CVR follows.
    Installs(f64),
    /// Scale clicks; CTR follows.
    Clicks(f64),
    /// Scale CVR; installs follow.
    Cvr(f64),
    /// Scale impressions; CTR follows.
    Impressions(f64),
    Cpi(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetentionImpact {
    AllRates(f64),
    D7(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonetizationImpact {
    AdRevenue(f64),
    IapRevenue(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventImpact {
    Acquisition(AcquisitionImpact),
    Retention(RetentionImpact),
    Monetization(MonetizationImpact),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketEvent {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub polarity: Polarity,
    pub impact: EventImpact,
}

impl MarketEvent {
    pub fn phase(&self) -> Phase {
        match self.impact {
            EventImpact::Acquisition(_) => Phase::Acquisition,
            EventImpact::Retention(_) => Phase::Retention,
            EventImpact::Monetization(_) => Phase::Monetization,
        }
    }

    pub fn by_id(id: &str) -> Option<&'static MarketEvent> {
        CATALOG.iter().find(|e| e.id == id)
    }
}

use AcquisitionImpact as A;
use MonetizationImpact as M;
use RetentionImpact as R;

pub static CATALOG: [MarketEvent; 10] = [
    MarketEvent {
        id: "viral_creative",
        title: "Viral Creative!",
        description: "One of your ads went viral! +15% installs.",
        polarity: Polarity::Positive,
        impact: EventImpact::Acquisition(A::Installs(1.15)),
    },
    MarketEvent {
        id: "ad_network_boost",
        title: "Ad Network Boost",
        description: "The ad network algorithm favors your ads! +20% clicks.",
        polarity: Polarity::Positive,
        impact: EventImpact::Acquisition(A::Clicks(1.2)),
    },
    MarketEvent {
        id: "targeting_improvement",
        title: "Targeting Sweet Spot",
        description: "Your audience targeting is performing exceptionally well! +25% CVR.",
        polarity: Polarity::Positive,
        impact: EventImpact::Acquisition(A::Cvr(1.25)),
    },
    MarketEvent {
        id: "platform_feature",
        title: "Platform Feature",
        description: "Your app got featured! +30% impressions without additional cost.",
        polarity: Polarity::Positive,
        impact: EventImpact::Acquisition(A::Impressions(1.3)),
    },
    MarketEvent {
        id: "competitor_exit",
        title: "Market Opportunity",
        description: "A major competitor paused their campaigns! -15% CPI.",
        polarity: Polarity::Positive,
        impact: EventImpact::Acquisition(A::Cpi(0.85)),
    },
    MarketEvent {
        id: "market_saturation",
        title: "Market Saturation",
        description: "Too many apps are bidding on your audience. +5% CPI.",
        polarity: Polarity::Negative,
        impact: EventImpact::Acquisition(A::Cpi(1.05)),
    },
    MarketEvent {
        id: "positive_reviews",
        title: "Positive Reviews",
        description: "Users love your app! +10% to all retention metrics.",
        polarity: Polarity::Positive,
        impact: EventImpact::Retention(R::AllRates(1.1)),
    },
    MarketEvent {
        id: "user_backlash",
        title: "User Backlash",
        description: "Users complain about notification frequency. -15% D7 retention.",
        polarity: Polarity::Negative,
        impact: EventImpact::Retention(R::D7(0.85)),
    },
    MarketEvent {
        id: "seasonal_boost",
        title: "Seasonal Boost",
        description: "Holiday season increases IAP purchases! +20% to IAP revenue.",
        polarity: Polarity::Positive,
        impact: EventImpact::Monetization(M::IapRevenue(1.2)),
    },
    MarketEvent {
        id: "ad_fatigue",
        title: "Ad Fatigue",
        description: "Users are showing ad fatigue. -15% to ad revenue.",
        polarity: Polarity::Negative,
        impact: EventImpact::Monetization(M::AdRevenue(0.85)),
    },
];

/// Roll this phase's positive then negative trigger.
///
/// Draws: one chance roll per polarity that still has room under the cap,
/// plus one pick per triggered polarity with a non-empty pool.
pub fn roll_events(
    cfg: &BalanceConfig,
    phase: Phase,
    already_shown: &[String],
    rng: &mut impl RandomSource,
) -> Vec<&'static MarketEvent> {
    let e = &cfg.events;
    let mut picked: Vec<&'static MarketEvent> = Vec::new();
    if !e.enabled {
        return picked;
    }

    for (polarity, probability) in [
        (Polarity::Positive, e.positive_probability),
        (Polarity::Negative, e.negative_probability),
    ] {
        if already_shown.len() + picked.len() >= e.max_per_session {
            break;
        }
        if !rng.chance(probability) {
            continue;
        }
        let pool: Vec<&'static MarketEvent> = CATALOG
            .iter()
            .filter(|ev| ev.phase() == phase && ev.polarity == polarity)
            .filter(|ev| !already_shown.iter().any(|id| id == ev.id))
            .filter(|ev| !picked.iter().any(|p| p.id == ev.id))
            .collect();
        if pool.is_empty() {
            continue;
        }
        picked.push(pool[rng.pick_index(pool.len())]);
    }
    picked
}

pub fn apply_acquisition_impact(impact: AcquisitionImpact, r: &mut AcquisitionResults) {
    let scale = |v: u64, k: f64| (v as f64 * k).floor().max(0.0) as u64;
    match impact {
        A::Installs(k) => {
            r.installs = scale(r.installs, k);
            r.cvr = safe_div(r.installs as f64, r.clicks as f64);
        }
        A::Clicks(k) => {
            r.clicks = scale(r.clicks, k);
            r.ctr = safe_div(r.clicks as f64, r.impressions as f64);
        }
        A::Cvr(k) => {
            r.cvr *= k;
            r.installs = (r.clicks as f64 * r.cvr).floor().max(0.0) as u64;
        }
        A::Impressions(k) => {
            r.impressions = scale(r.impressions, k);
            r.ctr = safe_div(r.clicks as f64, r.impressions as f64);
        }
        A::Cpi(k) => {
            r.cpi *= k;
        }
    }
}

/// Rates stay within the retention floor/ceiling; DAU scales with D7.
pub fn apply_retention_impact(cfg: &BalanceConfig, impact: RetentionImpact, r: &mut RetentionResults) {
    let bounds = &cfg.retention;
    let old_d7 = r.retention_rates.d7;
    let rates = &mut r.retention_rates;
    match impact {
        R::AllRates(k) => {
            rates.d1 = (rates.d1 * k).clamp(bounds.floor, bounds.ceiling);
            rates.d7 = (rates.d7 * k).clamp(bounds.floor, bounds.ceiling);
            rates.d30 = (rates.d30 * k).clamp(bounds.floor, bounds.ceiling);
        }
        R::D7(k) => {
            rates.d7 = (rates.d7 * k).clamp(bounds.floor, bounds.ceiling);
        }
    }
    let ratio = safe_div(r.retention_rates.d7, old_d7);
    r.dau = (r.dau as f64 * ratio).floor().max(0.0) as u64;
}

/// ARPDAU and projected ROAS follow the revenue change.
pub fn apply_monetization_impact(
    cfg: &BalanceConfig,
    impact: MonetizationImpact,
    r: &mut MonetizationResults,
    dau: u64,
) {
    match impact {
        M::AdRevenue(k) => r.ad_revenue *= k,
        M::IapRevenue(k) => r.iap_revenue *= k,
    }
    r.arpdau = safe_div(r.ad_revenue + r.iap_revenue, dau as f64);
    r.projected_roas = projected_roas(cfg, r.arpdau);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SequenceRng;

    #[test]
    fn catalog_ids_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            for b in CATALOG.iter().skip(i + 1) {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn every_phase_has_both_polarities() {
        for phase in [Phase::Acquisition, Phase::Retention, Phase::Monetization] {
            for pol in [Polarity::Positive, Polarity::Negative] {
                assert!(
                    CATALOG.iter().any(|e| e.phase() == phase && e.polarity == pol),
                    "{phase} has no {pol:?} event"
                );
            }
        }
    }

    #[test]
    fn viral_creative_recomputes_cvr() {
        let mut r = AcquisitionResults {
            impressions: 10_000, clicks: 500, ctr: 0.05, installs: 100, cvr: 0.2, cpi: 1.0, spend: 1000.0,
        };
        apply_acquisition_impact(AcquisitionImpact::Installs(1.15), &mut r);
        assert_eq!(r.installs, 114);
        assert!((r.cvr - 114.0 / 500.0).abs() < 1e-12);
    }

    #[test]
    fn zero_clicks_do_not_poison_cvr() {
        let mut r = AcquisitionResults {
            impressions: 0, clicks: 0, ctr: 0.05, installs: 0, cvr: 0.1, cpi: 1.0, spend: 500.0,
        };
        apply_acquisition_impact(AcquisitionImpact::Installs(1.15), &mut r);
        assert_eq!(r.cvr, 0.0);
    }

    #[test]
    fn certain_triggers_pick_from_both_pools() {
        let mut cfg = BalanceConfig::canonical();
        cfg.events.positive_probability = 1.0;
        cfg.events.negative_probability = 1.0;
        let picked = roll_events(&cfg, Phase::Retention, &[], &mut SequenceRng::constant(0.0));
        let ids: Vec<_> = picked.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["positive_reviews", "user_backlash"]);
    }

    #[test]
    fn shown_events_do_not_recur() {
        let mut cfg = BalanceConfig::canonical();
        cfg.events.positive_probability = 1.0;
        cfg.events.negative_probability = 0.0;
        let shown = vec!["positive_reviews".to_string()];
        let picked = roll_events(&cfg, Phase::Retention, &shown, &mut SequenceRng::constant(0.0));
        assert!(picked.is_empty());
    }
}
