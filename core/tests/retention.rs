//! Retention formula: strategy effects, clamps, genre floors and DAU.

use adsim_core::{
    config::BalanceConfig,
    formulas::{dau_for, simulate_retention},
    genre::{Genre, GenreMetrics},
    strategy::{ContentUpdates, EngagementSpend, NotificationFrequency, RetentionChoices},
};

fn choices(
    n: NotificationFrequency,
    c: ContentUpdates,
    special_events: bool,
    e: EngagementSpend,
) -> RetentionChoices {
    RetentionChoices {
        notification_frequency: n,
        content_updates: c,
        special_events,
        engagement_spend: e,
    }
}

fn strong() -> RetentionChoices {
    choices(NotificationFrequency::Frequent, ContentUpdates::Frequent, true, EngagementSpend::High)
}

fn weak() -> RetentionChoices {
    choices(NotificationFrequency::None, ContentUpdates::Rare, false, EngagementSpend::Low)
}

fn every_choice() -> Vec<RetentionChoices> {
    let mut all = Vec::new();
    for n in [NotificationFrequency::None, NotificationFrequency::Occasional, NotificationFrequency::Frequent] {
        for c in [ContentUpdates::Rare, ContentUpdates::Regular, ContentUpdates::Frequent] {
            for s in [false, true] {
                for e in [EngagementSpend::Low, EngagementSpend::Medium, EngagementSpend::High] {
                    all.push(choices(n, c, s, e));
                }
            }
        }
    }
    all
}

#[test]
fn engaged_strategy_beats_passive_one() {
    let cfg = BalanceConfig::canonical();
    let s = simulate_retention(&cfg, 1000, &strong(), &GenreMetrics::NEUTRAL);
    let w = simulate_retention(&cfg, 1000, &weak(), &GenreMetrics::NEUTRAL);
    assert!(s.retention_rates.d7 > w.retention_rates.d7);
    assert!(s.retention_rates.d30 > w.retention_rates.d30);
    assert!(s.dau > w.dau);
    assert!(s.session_length > w.session_length);
}

#[test]
fn passive_strategy_sits_on_base_rates() {
    let cfg = BalanceConfig::canonical();
    let w = simulate_retention(&cfg, 1000, &weak(), &GenreMetrics::NEUTRAL);
    let base = cfg.retention.base_rates;
    assert_eq!(w.retention_rates.d1, base.d1);
    assert_eq!(w.retention_rates.d7, base.d7);
    assert_eq!(w.retention_rates.d30, base.d30);
}

#[test]
fn rates_stay_within_bounds_for_every_choice_and_genre() {
    let cfg = BalanceConfig::canonical();
    let (lo, hi) = (cfg.retention.floor, cfg.retention.ceiling);
    for genre in Genre::ALL {
        for ch in every_choice() {
            let r = simulate_retention(&cfg, 800, &ch, &genre.metrics());
            for rate in [r.retention_rates.d1, r.retention_rates.d7, r.retention_rates.d30] {
                assert!((lo..=hi).contains(&rate), "{genre} {ch:?}: rate {rate} out of bounds");
            }
        }
    }
}

#[test]
fn adversarial_base_rates_are_clamped() {
    let mut cfg = BalanceConfig::canonical();
    cfg.retention.base_rates.d1 = 95.0;
    cfg.retention.base_rates.d7 = 90.0;
    cfg.retention.base_rates.d30 = 1.0;
    let r = simulate_retention(&cfg, 1000, &strong(), &Genre::SocialApp.metrics());
    assert_eq!(r.retention_rates.d1, cfg.retention.ceiling);
    assert_eq!(r.retention_rates.d7, cfg.retention.ceiling);

    let w = simulate_retention(&cfg, 1000, &weak(), &GenreMetrics::NEUTRAL);
    assert_eq!(w.retention_rates.d30, cfg.retention.floor);
}

#[test]
fn genre_penalty_is_floored() {
    let cfg = BalanceConfig::canonical();
    let mut harsh = GenreMetrics::NEUTRAL;
    harsh.retention.d1 = 0.3;
    harsh.session_length = 0.1;
    let mut at_floor = GenreMetrics::NEUTRAL;
    at_floor.retention.d1 = cfg.genre_caps.min_retention_modifier;
    at_floor.session_length = cfg.genre_caps.min_session_modifier;

    let a = simulate_retention(&cfg, 1000, &weak(), &harsh);
    let b = simulate_retention(&cfg, 1000, &weak(), &at_floor);
    assert_eq!(a.retention_rates.d1, b.retention_rates.d1);
    assert_eq!(a.session_length, b.session_length);
}

#[test]
fn dau_follows_installs_and_d7() {
    let cfg = BalanceConfig::canonical();
    assert_eq!(dau_for(&cfg, 500, 50.0), 300);
    assert_eq!(dau_for(&cfg, 0, 50.0), 0);

    let r = simulate_retention(&cfg, 750, &strong(), &Genre::EducationApp.metrics());
    assert_eq!(r.dau, dau_for(&cfg, 750, r.retention_rates.d7));
}

#[test]
fn zero_installs_still_yields_rates() {
    let cfg = BalanceConfig::canonical();
    let r = simulate_retention(&cfg, 0, &strong(), &GenreMetrics::NEUTRAL);
    assert_eq!(r.dau, 0);
    assert!(r.retention_rates.d7 > 0.0);
}
