//! Campaign history: bounded FIFO, newest-first reads, summaries, and the
//! engine's best-effort recording.

use adsim_core::{
    config::BalanceConfig,
    engine::CampaignEngine,
    genre::Genre,
    state::Phase,
    store::{summarize, CampaignHistoryEntry, HistoryMetrics, HistoryStore, StrategySnapshot},
    strategy::{
        AdFormat, AdFrequency, AgeGroup, AudiencePatch, AudienceTargeting, BiddingStrategy,
        ContentUpdates, CreativeFormat, EngagementSpend, IapPricing, Interest,
        MonetizationPatch, MonetizationStrategy, NotificationFrequency, PromotionalOffers,
        RetentionPatch, RetentionStrategy,
    },
};
use chrono::{Duration, TimeZone, Utc};

fn make_store() -> HistoryStore {
    let store = HistoryStore::in_memory(5).unwrap();
    store.migrate().unwrap();
    store
}

fn entry(n: i64, roas: f64, d7: f64, creatives: Vec<CreativeFormat>) -> CampaignHistoryEntry {
    CampaignHistoryEntry {
        id: format!("campaign-{n}"),
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(n),
        metrics: HistoryMetrics {
            genre: Some(Genre::SocialApp),
            spend: 1000.0,
            revenue: roas * 1000.0,
            roas,
            cpi: 1.3,
            installs: 90,
            retention_d7: d7,
            arpdau: 0.3,
        },
        strategy: StrategySnapshot {
            audience: AudienceTargeting::default(),
            creatives,
            bidding: Some(BiddingStrategy::Low),
            retention: RetentionStrategy::default(),
            monetization: MonetizationStrategy::default(),
        },
    }
}

fn play(engine: &mut CampaignEngine) {
    engine.start().unwrap();
    engine.choose_genre(Genre::ProductivityApp).unwrap();
    engine.set_budget(800.0).unwrap();
    engine.continue_step().unwrap();
    engine
        .set_audience(AudiencePatch {
            age_group: Some(AgeGroup::Age35To44),
            interests: Some([Interest::Lifestyle, Interest::Education].into_iter().collect()),
            ..Default::default()
        })
        .unwrap();
    engine.continue_step().unwrap();
    engine.set_creatives(vec![CreativeFormat::StaticBannerAds]).unwrap();
    engine.continue_step().unwrap();
    engine.choose_bidding(BiddingStrategy::Low).unwrap();
    engine
        .set_retention_strategy(RetentionPatch {
            notification_frequency: Some(NotificationFrequency::None),
            content_updates: Some(ContentUpdates::Regular),
            special_events: Some(false),
            engagement_spend: Some(EngagementSpend::Medium),
        })
        .unwrap();
    engine.calculate_retention().unwrap();
    engine.advance_to_monetization().unwrap();
    engine
        .set_monetization_strategy(MonetizationPatch {
            ad_formats: Some([AdFormat::Interstitial].into_iter().collect()),
            ad_frequency: Some(AdFrequency::Medium),
            iap_pricing: Some(IapPricing::High),
            promotional_offers: Some(PromotionalOffers::Limited),
        })
        .unwrap();
    engine.calculate_monetization().unwrap();
    engine.finish().unwrap();
}

#[test]
fn keeps_only_the_newest_five() {
    let store = make_store();
    for n in 0..7 {
        store.record(&entry(n, 0.5 + n as f64 * 0.1, 20.0, vec![])).unwrap();
    }
    let recent = store.recent().unwrap();
    assert_eq!(recent.len(), 5);
    assert_eq!(store.len().unwrap(), 5);
    let ids: Vec<&str> = recent.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["campaign-6", "campaign-5", "campaign-4", "campaign-3", "campaign-2"]);
}

#[test]
fn entries_round_trip_through_sqlite() {
    let store = make_store();
    let e = entry(1, 1.25, 31.0, vec![CreativeFormat::PlayableAds, CreativeFormat::RewardedVideos]);
    store.record(&e).unwrap();
    assert_eq!(store.recent().unwrap(), vec![e]);
}

#[test]
fn summary_appears_with_two_campaigns() {
    let store = make_store();
    store.record(&entry(0, 1.4, 18.0, vec![CreativeFormat::PlayableAds])).unwrap();
    assert!(store.summary().unwrap().is_none());

    store.record(&entry(1, 0.8, 33.0, vec![CreativeFormat::StaticBannerAds])).unwrap();
    store.record(&entry(2, 1.1, 21.0, vec![CreativeFormat::GameplayVideos])).unwrap();
    store.record(&entry(3, 1.2, 25.0, vec![CreativeFormat::EducationalVideos])).unwrap();

    let s = store.summary().unwrap().expect("summary with four campaigns");
    assert_eq!(s.best_roas, 1.4);
    assert_eq!(s.best_retention_d7, 33.0);
    // Two most recent profitable campaigns, newest first.
    assert_eq!(
        s.winning_creatives,
        vec![vec![CreativeFormat::EducationalVideos], vec![CreativeFormat::GameplayVideos]]
    );
}

#[test]
fn summary_without_profitable_campaigns_has_no_winners() {
    let s = summarize(&[entry(1, 0.6, 10.0, vec![]), entry(0, 0.9, 12.0, vec![])]).unwrap();
    assert!(s.winning_creatives.is_empty());
    assert_eq!(s.best_roas, 0.9);
}

#[test]
fn clear_empties_the_store() {
    let store = make_store();
    store.record(&entry(0, 1.0, 20.0, vec![])).unwrap();
    store.clear().unwrap();
    assert!(store.is_empty().unwrap());
}

#[test]
fn finishing_a_campaign_records_it() {
    let mut engine = CampaignEngine::new(BalanceConfig::canonical(), 31).with_history(make_store());
    play(&mut engine);
    assert_eq!(engine.state().current_phase, Phase::Results);

    let store = engine.history().expect("history attached");
    let recent = store.recent().unwrap();
    assert_eq!(recent.len(), 1);
    let fin = engine.state().final_results.as_ref().unwrap();
    assert_eq!(recent[0].metrics.roas, fin.roas);
    assert_eq!(recent[0].metrics.genre, Some(Genre::ProductivityApp));
    assert_eq!(recent[0].strategy.creatives, vec![CreativeFormat::StaticBannerAds]);
    assert_eq!(engine.journal().of_type("history_recorded").count(), 1);
}

#[test]
fn history_survives_a_reset() {
    let mut engine = CampaignEngine::new(BalanceConfig::canonical(), 12).with_history(make_store());
    play(&mut engine);
    engine.reset();
    play(&mut engine);
    assert_eq!(engine.history().unwrap().len().unwrap(), 2);
    assert!(engine.history().unwrap().summary().unwrap().is_some());
}

#[test]
fn write_failure_does_not_block_results() {
    // Never migrated: the insert fails.
    let broken = HistoryStore::in_memory(5).unwrap();
    let mut engine = CampaignEngine::new(BalanceConfig::canonical(), 3).with_history(broken);
    play(&mut engine);
    assert_eq!(engine.state().current_phase, Phase::Results);
    assert!(engine.state().final_results.is_some());
    assert_eq!(engine.journal().of_type("history_write_failed").count(), 1);
}
