//! Phase guards, back navigation, the reducer, and reset.

use adsim_core::{
    command::GameCommand,
    config::BalanceConfig,
    engine::CampaignEngine,
    error::SimError,
    genre::Genre,
    state::{AcquisitionStep, GameState, Phase},
    strategy::{
        AdFormat, AdFrequency, AgeGroup, AudiencePatch, BiddingStrategy, ContentUpdates,
        CreativeFormat, EngagementSpend, IapPricing, Interest, MonetizationPatch,
        NotificationFrequency, PromotionalOffers, RetentionPatch,
    },
};

fn make_engine() -> CampaignEngine {
    CampaignEngine::new(BalanceConfig::canonical().without_perturbation(), 2024)
}

fn launch(engine: &mut CampaignEngine) {
    engine.start().unwrap();
    engine.choose_genre(Genre::EducationApp).unwrap();
    engine.continue_step().unwrap();
    engine
        .set_audience(AudiencePatch {
            age_group: Some(AgeGroup::Age18To24),
            interests: Some([Interest::Education].into_iter().collect()),
            ..Default::default()
        })
        .unwrap();
    engine.continue_step().unwrap();
    engine.set_creatives(vec![CreativeFormat::EducationalVideos]).unwrap();
    engine.continue_step().unwrap();
    engine.choose_bidding(BiddingStrategy::Moderate).unwrap();
}

fn full_retention() -> RetentionPatch {
    RetentionPatch {
        notification_frequency: Some(NotificationFrequency::Occasional),
        content_updates: Some(ContentUpdates::Frequent),
        special_events: Some(false),
        engagement_spend: Some(EngagementSpend::High),
    }
}

fn full_monetization() -> MonetizationPatch {
    MonetizationPatch {
        ad_formats: Some([AdFormat::Rewarded].into_iter().collect()),
        ad_frequency: Some(AdFrequency::Low),
        iap_pricing: Some(IapPricing::High),
        promotional_offers: Some(PromotionalOffers::None),
    }
}

fn play_to_results(engine: &mut CampaignEngine) {
    launch(engine);
    engine.set_retention_strategy(full_retention()).unwrap();
    engine.calculate_retention().unwrap();
    engine.advance_to_monetization().unwrap();
    engine.set_monetization_strategy(full_monetization()).unwrap();
    engine.calculate_monetization().unwrap();
    engine.finish().unwrap();
}

#[test]
fn actions_before_start_report_session_not_started() {
    let mut engine = make_engine();
    assert!(matches!(engine.choose_genre(Genre::CasualGame), Err(SimError::SessionNotStarted)));
    assert!(matches!(engine.set_budget(1000.0), Err(SimError::SessionNotStarted)));
    assert!(matches!(engine.continue_step(), Err(SimError::SessionNotStarted)));
    assert!(matches!(engine.preview(Phase::Acquisition), Err(SimError::SessionNotStarted)));
    assert_eq!(engine.state(), &GameState::default(), "rejected actions must not touch state");
}

#[test]
fn acquisition_is_blocked_without_a_genre() {
    let mut engine = make_engine();
    engine.start().unwrap();
    let err = engine.dispatch(GameCommand::SetPhase { phase: Phase::Acquisition }).unwrap_err();
    assert!(matches!(err, SimError::TransitionBlocked { to: Phase::Acquisition, .. }));
    assert_eq!(engine.state().current_phase, Phase::GenreSelection);
}

#[test]
fn phases_cannot_be_skipped() {
    let mut engine = make_engine();
    engine.start().unwrap();
    engine.choose_genre(Genre::CasualGame).unwrap();
    for target in [Phase::Retention, Phase::Monetization, Phase::Results, Phase::Home] {
        assert!(
            engine.dispatch(GameCommand::SetPhase { phase: target }).is_err(),
            "jump to {target} must be refused"
        );
    }
    assert_eq!(engine.state().current_phase, Phase::Acquisition);
}

#[test]
fn inverted_age_range_is_rejected() {
    let mut engine = make_engine();
    engine.start().unwrap();
    engine.choose_genre(Genre::SocialApp).unwrap();
    let err = engine
        .set_audience(AudiencePatch { age_range: Some((50, 20)), ..Default::default() })
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidInput { field: "age_range", .. }));
}

#[test]
fn audience_step_requires_age_and_interest() {
    let mut engine = make_engine();
    engine.start().unwrap();
    engine.choose_genre(Genre::CasualGame).unwrap();
    engine.continue_step().unwrap();
    assert_eq!(engine.state().acquisition_step, AcquisitionStep::Audience);

    assert!(engine.continue_step().is_err());
    engine.toggle_interest(Interest::Lifestyle).unwrap();
    assert!(engine.continue_step().is_err(), "an interest without an age is not enough");
    engine
        .set_audience(AudiencePatch { age_range: Some((21, 40)), ..Default::default() })
        .unwrap();
    engine.continue_step().unwrap();
    assert_eq!(engine.state().acquisition_step, AcquisitionStep::Creative);

    // Creative step needs at least one format.
    assert!(engine.continue_step().is_err());
}

#[test]
fn back_navigation_keeps_entered_data() {
    let mut engine = make_engine();
    engine.start().unwrap();
    engine.choose_genre(Genre::FitnessHealth).unwrap();
    engine.set_budget(1700.0).unwrap();
    engine.continue_step().unwrap();
    engine.toggle_interest(Interest::Gaming).unwrap();
    engine
        .set_audience(AudiencePatch { age_group: Some(AgeGroup::Age45To54), ..Default::default() })
        .unwrap();
    engine.continue_step().unwrap();

    engine.back_step().unwrap();
    engine.back_step().unwrap();
    assert_eq!(engine.state().acquisition_step, AcquisitionStep::Budget);
    assert_eq!(engine.state().budget, 1700.0);
    assert!(engine.state().audience_targeting.interests.contains(&Interest::Gaming));
    assert!(engine.back_step().is_err(), "no step before budget");
}

#[test]
fn bidding_only_launches_from_the_bidding_step() {
    let mut engine = make_engine();
    engine.start().unwrap();
    engine.choose_genre(Genre::CasualGame).unwrap();
    let err = engine.choose_bidding(BiddingStrategy::High).unwrap_err();
    assert!(matches!(err, SimError::TransitionBlocked { .. }));
    assert!(engine.state().phase1_results.is_none());
    assert!(engine.state().bidding_strategy.is_none());
}

#[test]
fn invalid_budget_is_rejected() {
    let mut engine = make_engine();
    engine.start().unwrap();
    engine.choose_genre(Genre::CasualGame).unwrap();
    for bad in [0.0, 499.0, 2100.0, 1050.0] {
        assert!(
            matches!(engine.set_budget(bad), Err(SimError::InvalidInput { field: "budget", .. })),
            "budget {bad} must be rejected"
        );
    }
    assert_eq!(engine.state().budget, 1000.0);
}

#[test]
fn budget_is_frozen_after_launch() {
    let mut engine = make_engine();
    launch(&mut engine);
    assert!(matches!(
        engine.set_budget(1500.0),
        Err(SimError::InvalidInput { field: "budget", .. })
    ));
    // Raw dispatch goes through the same guard.
    engine.dispatch(GameCommand::SetBudget { budget: 1500.0 }).unwrap_err();
    assert_eq!(engine.state().budget, 1000.0);
}

#[test]
fn incomplete_retention_strategy_blocks_calculation() {
    let mut engine = make_engine();
    launch(&mut engine);
    engine
        .set_retention_strategy(RetentionPatch {
            notification_frequency: Some(NotificationFrequency::Frequent),
            ..Default::default()
        })
        .unwrap();
    let before = engine.state().clone();
    assert!(engine.calculate_retention().is_err());
    assert_eq!(engine.state(), &before, "a failed guard must leave state untouched");
    assert!(engine.advance_to_monetization().is_err());
}

#[test]
fn monetization_requires_retention_results() {
    let mut engine = make_engine();
    launch(&mut engine);
    engine.set_retention_strategy(full_retention()).unwrap();
    assert!(
        engine.advance_to_monetization().is_err(),
        "complete strategy alone is not enough; results must be committed"
    );
    engine.calculate_retention().unwrap();
    assert!(engine.calculate_retention().is_err(), "results commit once");
    engine.advance_to_monetization().unwrap();
    assert!(engine.set_retention_strategy(full_retention()).is_err());
}

#[test]
fn results_require_monetization_results() {
    let mut engine = make_engine();
    launch(&mut engine);
    engine.set_retention_strategy(full_retention()).unwrap();
    engine.calculate_retention().unwrap();
    engine.advance_to_monetization().unwrap();
    engine.set_monetization_strategy(full_monetization()).unwrap();
    assert!(engine.finish().is_err());
    engine.calculate_monetization().unwrap();
    engine.finish().unwrap();
    assert_eq!(engine.state().current_phase, Phase::Results);
    assert!(engine.state().final_results.is_some());
}

#[test]
fn reset_restores_every_default() {
    let mut engine = make_engine();
    play_to_results(&mut engine);
    engine.dispatch(GameCommand::ResetGame).unwrap();
    assert_eq!(engine.state(), &GameState::default());
    assert_eq!(engine.journal().entries().len(), 1);
    assert_eq!(engine.journal().entries()[0].event_type, "session_reset");

    // A fresh session is playable straight away.
    play_to_results(&mut engine);
    assert_eq!(engine.state().current_phase, Phase::Results);
}

#[test]
fn genre_cannot_change_once_chosen() {
    let mut state = GameState::default();
    state.apply(GameCommand::SetAppGenre { genre: Genre::SocialApp });
    state.apply(GameCommand::SetAppGenre { genre: Genre::ProductivityApp });
    assert_eq!(state.app_genre, Some(Genre::SocialApp));
    assert_eq!(state.genre_metrics, Some(Genre::SocialApp.metrics()));
}

#[test]
fn unknown_commands_are_ignored() {
    assert!(GameCommand::parse(r#"{"cmd":"LAUNCH_ROCKET"}"#).is_none());
    assert!(GameCommand::parse("not json").is_none());
    let parsed = GameCommand::parse(r#"{"cmd":"SET_BUDGET","budget":1500.0}"#);
    assert_eq!(parsed, Some(GameCommand::SetBudget { budget: 1500.0 }));
}

#[test]
fn achievements_and_recommendations_read_committed_state() {
    let mut engine = make_engine();
    assert!(engine.achievements().is_empty());
    play_to_results(&mut engine);
    // Pure reads: calling twice yields the same answer and changes nothing.
    let before = engine.state().clone();
    assert_eq!(engine.achievements(), engine.achievements());
    let _ = engine.recommendations(Phase::Acquisition);
    assert_eq!(engine.state(), &before);
}

#[test]
fn raw_commands_cannot_overwrite_committed_results() {
    let mut engine = make_engine();
    launch(&mut engine);
    let committed = engine.state().phase1_results.unwrap();

    let mut forged = committed;
    forged.installs = 999_999;
    let err = engine.dispatch(GameCommand::SetPhase1Results(forged)).unwrap_err();
    assert!(matches!(err, SimError::InvalidInput { field: "phase1_results", .. }));
    assert_eq!(engine.state().phase1_results, Some(committed));

    // Echoing the committed record back is harmless.
    engine.dispatch(GameCommand::SetPhase1Results(committed)).unwrap();

    let err = engine
        .dispatch(GameCommand::RecordMarketEvent { event_id: "made_up".into() })
        .unwrap_err();
    assert!(matches!(err, SimError::InvalidInput { field: "shown_events", .. }));
    assert!(engine.state().shown_events.is_empty());
}

#[test]
fn raw_commands_cannot_fabricate_later_phase_results() {
    let mut engine = make_engine();
    play_to_results(&mut engine);
    let fin = engine.state().final_results.clone().unwrap();
    let mut forged = fin.clone();
    forged.roas = 12.0;
    assert!(engine.dispatch(GameCommand::SetFinalResults(forged)).is_err());
    assert_eq!(engine.state().final_results.as_ref(), Some(&fin));

    let mut fresh = make_engine();
    fresh.start().unwrap();
    fresh.choose_genre(Genre::CasualGame).unwrap();
    let p2 = engine.state().phase2_results.unwrap();
    let p3 = engine.state().phase3_results.unwrap();
    assert!(fresh.dispatch(GameCommand::SetPhase2Results(p2)).is_err());
    assert!(fresh.dispatch(GameCommand::SetPhase3Results(p3)).is_err());
    assert!(fresh.state().phase2_results.is_none());
    assert!(fresh.state().phase3_results.is_none());
}

#[test]
fn raw_step_changes_cannot_skip_acquisition_inputs() {
    let mut engine = make_engine();
    engine.start().unwrap();
    engine.choose_genre(Genre::CasualGame).unwrap();

    let err = engine
        .dispatch(GameCommand::SetAcquisitionStep { step: AcquisitionStep::Bidding })
        .unwrap_err();
    assert!(matches!(err, SimError::TransitionBlocked { .. }));
    // Refused as a whole: not even the budget step was passed.
    assert_eq!(engine.state().acquisition_step, AcquisitionStep::Budget);
    assert!(engine.choose_bidding(BiddingStrategy::High).is_err());
    assert!(engine.state().phase1_results.is_none());
    assert_eq!(engine.state().current_phase, Phase::Acquisition);
}

#[test]
fn raw_step_changes_walk_through_the_guards() {
    let mut engine = make_engine();
    engine.start().unwrap();
    engine.choose_genre(Genre::CasualGame).unwrap();
    engine
        .dispatch(GameCommand::SetAudienceTargeting(AudiencePatch {
            age_group: Some(AgeGroup::Age25To34),
            interests: Some([Interest::Gaming].into_iter().collect()),
            ..Default::default()
        }))
        .unwrap();
    engine
        .dispatch(GameCommand::SetCreativeSelection { formats: vec![CreativeFormat::PlayableAds] })
        .unwrap();
    engine
        .dispatch(GameCommand::SetAcquisitionStep { step: AcquisitionStep::Bidding })
        .unwrap();
    assert_eq!(engine.state().acquisition_step, AcquisitionStep::Bidding);

    engine
        .dispatch(GameCommand::SetAcquisitionStep { step: AcquisitionStep::Audience })
        .unwrap();
    assert_eq!(engine.state().acquisition_step, AcquisitionStep::Audience);
    assert_eq!(engine.state().creative_selection.formats, vec![CreativeFormat::PlayableAds]);
}

#[test]
fn raw_bidding_launches_like_the_named_operation() {
    let mut engine = make_engine();
    engine.start().unwrap();
    engine.choose_genre(Genre::EducationApp).unwrap();
    assert!(engine
        .dispatch(GameCommand::SetBiddingStrategy { strategy: BiddingStrategy::Low })
        .is_err());
    assert!(engine.state().bidding_strategy.is_none());

    let mut named = make_engine();
    launch(&mut named);
    let mut raw = make_engine();
    raw.start().unwrap();
    raw.choose_genre(Genre::EducationApp).unwrap();
    raw.continue_step().unwrap();
    raw.set_audience(AudiencePatch {
        age_group: Some(AgeGroup::Age18To24),
        interests: Some([Interest::Education].into_iter().collect()),
        ..Default::default()
    })
    .unwrap();
    raw.continue_step().unwrap();
    raw.set_creatives(vec![CreativeFormat::EducationalVideos]).unwrap();
    raw.continue_step().unwrap();
    raw.dispatch(GameCommand::SetBiddingStrategy { strategy: BiddingStrategy::Moderate }).unwrap();
    assert_eq!(raw.state().current_phase, Phase::Retention);
    assert_eq!(raw.state().phase1_results, named.state().phase1_results);
}

#[test]
fn bidding_rechecks_inputs_edited_after_reaching_the_step() {
    let mut engine = make_engine();
    engine.start().unwrap();
    engine.choose_genre(Genre::CasualGame).unwrap();
    engine.continue_step().unwrap();
    engine
        .set_audience(AudiencePatch {
            age_group: Some(AgeGroup::Age18To24),
            interests: Some([Interest::Gaming].into_iter().collect()),
            ..Default::default()
        })
        .unwrap();
    engine.continue_step().unwrap();
    engine.set_creatives(vec![CreativeFormat::GameplayVideos]).unwrap();
    engine.continue_step().unwrap();
    assert_eq!(engine.state().acquisition_step, AcquisitionStep::Bidding);

    engine.set_creatives(vec![]).unwrap();
    let err = engine.choose_bidding(BiddingStrategy::High).unwrap_err();
    assert!(matches!(err, SimError::TransitionBlocked { to: Phase::Retention, .. }));
    assert!(engine.state().phase1_results.is_none());
    assert!(engine.state().bidding_strategy.is_none());

    engine.set_creatives(vec![CreativeFormat::GameplayVideos]).unwrap();
    engine
        .set_audience(AudiencePatch { interests: Some(Default::default()), ..Default::default() })
        .unwrap();
    assert!(engine.choose_bidding(BiddingStrategy::High).is_err());

    engine.toggle_interest(Interest::Gaming).unwrap();
    engine.choose_bidding(BiddingStrategy::High).unwrap();
    assert_eq!(engine.state().current_phase, Phase::Retention);
}

#[test]
fn raw_genre_selection_phase_starts_the_session() {
    let mut engine = make_engine();
    engine.dispatch(GameCommand::SetPhase { phase: Phase::GenreSelection }).unwrap();
    assert_eq!(engine.state().current_phase, Phase::GenreSelection);
    assert_eq!(engine.journal().of_type("session_started").count(), 1);
}

#[test]
fn raw_results_phase_finishes_the_campaign() {
    let mut engine = make_engine();
    launch(&mut engine);
    engine.set_retention_strategy(full_retention()).unwrap();
    engine.calculate_retention().unwrap();
    engine.advance_to_monetization().unwrap();
    engine.set_monetization_strategy(full_monetization()).unwrap();
    engine.calculate_monetization().unwrap();
    engine.dispatch(GameCommand::SetPhase { phase: Phase::Results }).unwrap();
    assert_eq!(engine.state().current_phase, Phase::Results);
    assert!(engine.state().final_results.is_some());
}
