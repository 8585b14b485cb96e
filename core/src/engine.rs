//! The campaign engine: the single owner of a session.
//!
//! PIPELINE (fixed, per phase, never reordered):
//!   1. Guard check        (state.rs `can_*`)
//!   2. Formula            (phase stream)
//!   3. Variance           (variance stream)
//!   4. Market events      (events stream)
//!   5. Feedback           (feedback stream)
//!   6. Commit             (one command per field, via the reducer)
//!
//! RULES:
//!   - Every state change goes through `GameState::apply`.
//!   - A failed guard returns an error and leaves state untouched.
//!   - All randomness flows through the RngBank.
//!   - Every commit is appended to the journal.
//!   - History persistence is best-effort; its failures never surface.

use crate::{
    achievements::{self, Achievement},
    advisor::{self, Recommendation},
    aggregator::aggregate,
    command::GameCommand,
    config::BalanceConfig,
    error::{SimError, SimResult},
    event::{Journal, SessionEvent},
    formulas::{
        acquisition_feedback, monetization_feedback, retention_feedback, simulate_acquisition,
        simulate_monetization, simulate_retention, AcquisitionInput,
    },
    genre::Genre,
    market_events::{
        apply_acquisition_impact, apply_monetization_impact, apply_retention_impact, roll_events,
        EventImpact, MarketEvent, Polarity,
    },
    preview::{self, Preview},
    rng::{RngBank, RngSlot},
    state::{AcquisitionStep, GameState, Phase},
    store::{CampaignHistoryEntry, HistoryStore},
    strategy::{
        AudiencePatch, BiddingStrategy, CreativeFormat, Interest, MonetizationPatch,
        RetentionPatch,
    },
    types::Dollars,
    variance::{perturb_acquisition, perturb_monetization, perturb_retention},
};
use serde::{Deserialize, Serialize};

/// A market event as shown to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShownEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub polarity: Polarity,
}

impl From<&MarketEvent> for ShownEvent {
    fn from(e: &MarketEvent) -> Self {
        Self {
            id: e.id.to_string(),
            title: e.title.to_string(),
            description: e.description.to_string(),
            polarity: e.polarity,
        }
    }
}

/// What a committed phase surfaces alongside its results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub feedback: Vec<String>,
    pub market_events: Vec<ShownEvent>,
}

pub struct CampaignEngine {
    state: GameState,
    config: BalanceConfig,
    rng_bank: RngBank,
    history: Option<HistoryStore>,
    journal: Journal,
}

impl CampaignEngine {
    pub fn new(config: BalanceConfig, seed: u64) -> Self {
        Self {
            state: GameState::default(),
            config,
            rng_bank: RngBank::new(seed),
            history: None,
            journal: Journal::default(),
        }
    }

    /// Attach a (migrated) history store; finished campaigns are recorded there.
    pub fn with_history(mut self, store: HistoryStore) -> Self {
        self.history = Some(store);
        self
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &BalanceConfig {
        &self.config
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn history(&self) -> Option<&HistoryStore> {
        self.history.as_ref()
    }

    pub fn seed(&self) -> u64 {
        self.rng_bank.master_seed()
    }

    // ── Command path ───────────────────────────────────────────

    fn commit(&mut self, command: GameCommand) {
        let kind = command.kind();
        self.state.apply(command);
        self.journal.record(
            self.state.current_phase,
            SessionEvent::CommandApplied { command: kind.to_string() },
        );
    }

    fn enter(&mut self, to: Phase) -> SimResult<()> {
        self.state.can_enter(to)?;
        let from = self.state.current_phase;
        self.commit(GameCommand::SetPhase { phase: to });
        self.journal.record(to, SessionEvent::PhaseEntered { from, to });
        log::info!("session: {from} -> {to}");
        Ok(())
    }

    fn ensure_active(&self) -> SimResult<()> {
        if self.state.current_phase == Phase::Home {
            return Err(SimError::SessionNotStarted);
        }
        Ok(())
    }

    fn ensure_acquisition_open(&self, field: &'static str) -> SimResult<()> {
        self.ensure_active()?;
        if self.state.phase1_results.is_some() {
            return Err(SimError::InvalidInput {
                field,
                reason: "acquisition results are already committed".into(),
            });
        }
        Ok(())
    }

    /// Apply one raw command from an external surface, with the same guards
    /// the named operations use.
    ///
    /// Each variant routes to its named operation: phase changes go through
    /// `can_enter`, `SET_PHASE` to `genre_selection` is `start`, and
    /// `SET_PHASE` to `results` is `finish`, which aggregates and writes
    /// history. `SET_ACQUISITION_STEP` walks continue/back one step at a
    /// time. `SET_BIDDING_STRATEGY` launches the campaign. Result records
    /// and market events are derived, so they are only accepted when they
    /// equal what is already committed. `RESET_GAME` is a full reset.
    pub fn dispatch(&mut self, command: GameCommand) -> SimResult<()> {
        match command {
            GameCommand::SetPhase { phase: Phase::GenreSelection } => self.start(),
            GameCommand::SetPhase { phase: Phase::Results } => self.finish(),
            GameCommand::SetPhase { phase } => {
                self.ensure_active()?;
                self.enter(phase)
            }
            GameCommand::SetAcquisitionStep { step } => self.go_to_step(step),
            GameCommand::SetAppGenre { genre } => self.choose_genre(genre),
            GameCommand::SetBudget { budget } => self.set_budget(budget),
            GameCommand::SetAudienceTargeting(patch) => self.set_audience(patch),
            GameCommand::SetCreativeSelection { formats } => self.set_creatives(formats),
            GameCommand::SetBiddingStrategy { strategy } => self.choose_bidding(strategy).map(|_| ()),
            GameCommand::SetRetentionStrategy(patch) => self.set_retention_strategy(patch),
            GameCommand::SetMonetizationStrategy(patch) => self.set_monetization_strategy(patch),
            GameCommand::SetPhase1Results(r) => {
                self.confirm_derived("phase1_results", self.state.phase1_results == Some(r))
            }
            GameCommand::SetPhase2Results(r) => {
                self.confirm_derived("phase2_results", self.state.phase2_results == Some(r))
            }
            GameCommand::SetPhase3Results(r) => {
                self.confirm_derived("phase3_results", self.state.phase3_results == Some(r))
            }
            GameCommand::SetFinalResults(r) => {
                let same = self.state.final_results.as_ref() == Some(&r);
                self.confirm_derived("final_results", same)
            }
            GameCommand::RecordMarketEvent { event_id } => {
                let shown = self.state.shown_events.contains(&event_id);
                self.confirm_derived("shown_events", shown)
            }
            GameCommand::ResetGame => {
                self.reset();
                Ok(())
            }
        }
    }

    /// Derived records never come from outside; a matching copy is a no-op.
    fn confirm_derived(&self, field: &'static str, matches_committed: bool) -> SimResult<()> {
        self.ensure_active()?;
        if matches_committed {
            return Ok(());
        }
        Err(SimError::InvalidInput {
            field,
            reason: "computed by the engine; it cannot be set directly".into(),
        })
    }

    fn go_to_step(&mut self, step: AcquisitionStep) -> SimResult<()> {
        self.ensure_acquisition_open("acquisition_step")?;
        // Check every forward step on a copy so a refusal changes nothing.
        let mut trial = self.state.clone();
        while (step as u8) > (trial.acquisition_step as u8) {
            trial.can_continue_acquisition()?;
            let Some(next) = trial.acquisition_step.next() else { break };
            trial.apply(GameCommand::SetAcquisitionStep { step: next });
        }
        while self.state.acquisition_step != step {
            if (step as u8) > (self.state.acquisition_step as u8) {
                self.continue_step()?;
            } else {
                self.back_step()?;
            }
        }
        Ok(())
    }

    // ── Home / genre ───────────────────────────────────────────

    pub fn start(&mut self) -> SimResult<()> {
        if self.journal.entries().is_empty() {
            self.journal.record(Phase::Home, SessionEvent::SessionStarted { seed: self.seed() });
        }
        self.enter(Phase::GenreSelection)
    }

    /// Commit the genre and move straight on to acquisition.
    pub fn choose_genre(&mut self, genre: Genre) -> SimResult<()> {
        self.ensure_active()?;
        if self.state.current_phase != Phase::GenreSelection {
            return Err(SimError::TransitionBlocked {
                from: self.state.current_phase,
                to: Phase::Acquisition,
                reason: "the genre is chosen once, on the genre screen".into(),
            });
        }
        self.commit(GameCommand::SetAppGenre { genre });
        self.journal.record(Phase::GenreSelection, SessionEvent::GenreChosen { genre });
        self.enter(Phase::Acquisition)
    }

    // ── Acquisition ────────────────────────────────────────────

    pub fn set_budget(&mut self, budget: Dollars) -> SimResult<()> {
        self.ensure_acquisition_open("budget")?;
        let a = &self.config.acquisition;
        if !a.budget_is_valid(budget) {
            return Err(SimError::InvalidInput {
                field: "budget",
                reason: format!(
                    "{budget} is not within {}..={} in steps of {}",
                    a.budget_min, a.budget_max, a.budget_step
                ),
            });
        }
        self.commit(GameCommand::SetBudget { budget });
        Ok(())
    }

    pub fn set_audience(&mut self, patch: AudiencePatch) -> SimResult<()> {
        self.ensure_acquisition_open("audience_targeting")?;
        if let Some((min, max)) = patch.age_range {
            if min > max {
                return Err(SimError::InvalidInput {
                    field: "age_range",
                    reason: format!("min age {min} exceeds max age {max}"),
                });
            }
        }
        self.commit(GameCommand::SetAudienceTargeting(patch));
        Ok(())
    }

    pub fn toggle_interest(&mut self, interest: Interest) -> SimResult<()> {
        let mut interests = self.state.audience_targeting.interests.clone();
        if !interests.remove(&interest) {
            interests.insert(interest);
        }
        self.set_audience(AudiencePatch { interests: Some(interests), ..Default::default() })
    }

    pub fn set_creatives(&mut self, formats: Vec<CreativeFormat>) -> SimResult<()> {
        self.ensure_acquisition_open("creative_selection")?;
        self.commit(GameCommand::SetCreativeSelection { formats });
        Ok(())
    }

    /// Returns false when the selection is full and the format was not added.
    pub fn toggle_creative(&mut self, format: CreativeFormat) -> SimResult<bool> {
        self.ensure_acquisition_open("creative_selection")?;
        let mut selection = self.state.creative_selection.clone();
        let accepted = selection.toggle(format);
        if accepted {
            self.commit(GameCommand::SetCreativeSelection { formats: selection.formats });
        }
        Ok(accepted)
    }

    /// "Continue" on the current acquisition sub-step.
    pub fn continue_step(&mut self) -> SimResult<()> {
        self.ensure_active()?;
        self.state.can_continue_acquisition()?;
        if let Some(step) = self.state.acquisition_step.next() {
            self.commit(GameCommand::SetAcquisitionStep { step });
            self.journal.record(Phase::Acquisition, SessionEvent::AcquisitionStepChanged { step });
        }
        Ok(())
    }

    /// "Back" within acquisition. Entered data is kept.
    pub fn back_step(&mut self) -> SimResult<()> {
        self.ensure_active()?;
        let blocked = |reason: &str| SimError::TransitionBlocked {
            from: self.state.current_phase,
            to: Phase::Acquisition,
            reason: reason.to_string(),
        };
        if self.state.current_phase != Phase::Acquisition || self.state.phase1_results.is_some() {
            return Err(blocked("back navigation only exists inside an open acquisition phase"));
        }
        let step = self
            .state
            .acquisition_step
            .previous()
            .ok_or_else(|| blocked("already at the first step"))?;
        self.commit(GameCommand::SetAcquisitionStep { step });
        self.journal.record(Phase::Acquisition, SessionEvent::AcquisitionStepChanged { step });
        Ok(())
    }

    /// Choosing a bid launches the campaign: acquisition results are
    /// computed, committed, and the session moves on to retention.
    pub fn choose_bidding(&mut self, strategy: BiddingStrategy) -> SimResult<PhaseReport> {
        self.ensure_acquisition_open("bidding_strategy")?;
        if self.state.current_phase != Phase::Acquisition
            || self.state.acquisition_step != AcquisitionStep::Bidding
        {
            return Err(SimError::TransitionBlocked {
                from: self.state.current_phase,
                to: Phase::Retention,
                reason: "complete the budget, audience and creative steps first".into(),
            });
        }
        self.state.can_launch()?;
        self.commit(GameCommand::SetBiddingStrategy { strategy });

        let s = &self.state;
        let input = AcquisitionInput {
            budget: s.budget,
            age_group: s.audience_targeting.age_group,
            interests: &s.audience_targeting.interests,
            formats: &s.creative_selection.formats,
            bidding: s.bidding_strategy,
            genre: s.modifiers(),
        };
        let mut results =
            simulate_acquisition(&self.config, &input, self.rng_bank.stream(RngSlot::Acquisition));
        log::debug!(
            "acquisition: formula installs={} cpi={:.3} ctr={:.4} cvr={:.4}",
            results.installs, results.cpi, results.ctr, results.cvr
        );
        perturb_acquisition(&self.config, &mut results, self.rng_bank.stream(RngSlot::Variance));

        let events = roll_events(
            &self.config,
            Phase::Acquisition,
            &self.state.shown_events,
            self.rng_bank.stream(RngSlot::Events),
        );
        for ev in &events {
            if let EventImpact::Acquisition(impact) = ev.impact {
                apply_acquisition_impact(impact, &mut results);
            }
        }
        let feedback =
            acquisition_feedback(&self.config, &results, self.rng_bank.stream(RngSlot::Feedback));

        self.commit(GameCommand::SetPhase1Results(results));
        self.journal.record(
            Phase::Acquisition,
            SessionEvent::AcquisitionCommitted {
                installs: results.installs,
                cpi: results.cpi,
                ctr: results.ctr,
                cvr: results.cvr,
            },
        );
        log::info!(
            "acquisition committed: installs={} cpi={:.2} bid={strategy:?}",
            results.installs, results.cpi
        );
        let report = self.record_perturbations(Phase::Acquisition, &events, feedback);
        self.enter(Phase::Retention)?;
        Ok(report)
    }

    // ── Retention ──────────────────────────────────────────────

    pub fn set_retention_strategy(&mut self, patch: RetentionPatch) -> SimResult<()> {
        self.ensure_active()?;
        self.ensure_open(Phase::Retention, self.state.phase2_results.is_some())?;
        self.commit(GameCommand::SetRetentionStrategy(patch));
        Ok(())
    }

    pub fn calculate_retention(&mut self) -> SimResult<PhaseReport> {
        self.ensure_active()?;
        self.state.can_calculate_retention()?;
        let installs = self.state.phase1_results.map(|r| r.installs).unwrap_or(0);
        let Some(choices) = self.state.retention_strategy.complete() else {
            return Err(SimError::InvalidInput {
                field: "retention_strategy",
                reason: "incomplete".into(),
            });
        };

        let mut results = simulate_retention(&self.config, installs, &choices, &self.state.modifiers());
        log::debug!(
            "retention: formula d1={:.1} d7={:.1} d30={:.1} dau={}",
            results.retention_rates.d1, results.retention_rates.d7, results.retention_rates.d30, results.dau
        );
        perturb_retention(&self.config, &mut results, self.rng_bank.stream(RngSlot::Variance));

        let events = roll_events(
            &self.config,
            Phase::Retention,
            &self.state.shown_events,
            self.rng_bank.stream(RngSlot::Events),
        );
        for ev in &events {
            if let EventImpact::Retention(impact) = ev.impact {
                apply_retention_impact(&self.config, impact, &mut results);
            }
        }
        let feedback =
            retention_feedback(&self.config, &results, self.rng_bank.stream(RngSlot::Feedback));

        self.commit(GameCommand::SetPhase2Results(results));
        let rates = results.retention_rates;
        self.journal.record(
            Phase::Retention,
            SessionEvent::RetentionCommitted { d1: rates.d1, d7: rates.d7, d30: rates.d30, dau: results.dau },
        );
        log::info!("retention committed: d7={:.1}% dau={}", rates.d7, results.dau);
        Ok(self.record_perturbations(Phase::Retention, &events, feedback))
    }

    pub fn advance_to_monetization(&mut self) -> SimResult<()> {
        self.ensure_active()?;
        self.enter(Phase::Monetization)
    }

    // ── Monetization ───────────────────────────────────────────

    pub fn set_monetization_strategy(&mut self, patch: MonetizationPatch) -> SimResult<()> {
        self.ensure_active()?;
        self.ensure_open(Phase::Monetization, self.state.phase3_results.is_some())?;
        self.commit(GameCommand::SetMonetizationStrategy(patch));
        Ok(())
    }

    pub fn calculate_monetization(&mut self) -> SimResult<PhaseReport> {
        self.ensure_active()?;
        self.state.can_calculate_monetization()?;
        let dau = self.state.phase2_results.map(|r| r.dau).unwrap_or(0);
        let Some(choices) = self.state.monetization_strategy.complete() else {
            return Err(SimError::InvalidInput {
                field: "monetization_strategy",
                reason: "incomplete".into(),
            });
        };

        let mut results = simulate_monetization(
            &self.config,
            dau,
            &choices,
            &self.state.modifiers(),
            self.rng_bank.stream(RngSlot::Monetization),
        );
        log::debug!(
            "monetization: formula ad={:.2} iap={:.2} arpdau={:.3} fill={:.3}",
            results.ad_revenue, results.iap_revenue, results.arpdau, results.fill_rate
        );
        perturb_monetization(&self.config, &mut results, dau, self.rng_bank.stream(RngSlot::Variance));

        let events = roll_events(
            &self.config,
            Phase::Monetization,
            &self.state.shown_events,
            self.rng_bank.stream(RngSlot::Events),
        );
        for ev in &events {
            if let EventImpact::Monetization(impact) = ev.impact {
                apply_monetization_impact(&self.config, impact, &mut results, dau);
            }
        }
        let feedback =
            monetization_feedback(&self.config, &results, self.rng_bank.stream(RngSlot::Feedback));

        self.commit(GameCommand::SetPhase3Results(results));
        self.journal.record(
            Phase::Monetization,
            SessionEvent::MonetizationCommitted {
                arpdau: results.arpdau,
                projected_roas: results.projected_roas,
            },
        );
        log::info!(
            "monetization committed: arpdau={:.3} revenue={:.2}",
            results.arpdau,
            results.ad_revenue + results.iap_revenue
        );
        Ok(self.record_perturbations(Phase::Monetization, &events, feedback))
    }

    // ── Results ────────────────────────────────────────────────

    /// Aggregate, enter results, and record the campaign in history.
    pub fn finish(&mut self) -> SimResult<()> {
        self.ensure_active()?;
        self.state.can_enter(Phase::Results)?;
        let (Some(retention), Some(monetization)) = (self.state.phase2_results, self.state.phase3_results)
        else {
            return Err(SimError::TransitionBlocked {
                from: self.state.current_phase,
                to: Phase::Results,
                reason: "phase results missing".into(),
            });
        };

        let final_results = aggregate(&self.config.insights, self.state.budget, &retention, &monetization);
        self.journal.record(
            Phase::Monetization,
            SessionEvent::CampaignFinished {
                total_spend: final_results.total_spend,
                total_revenue: final_results.total_revenue,
                roas: final_results.roas,
            },
        );
        self.commit(GameCommand::SetFinalResults(final_results));
        self.enter(Phase::Results)?;
        self.record_history();
        Ok(())
    }

    fn record_history(&mut self) {
        let Some(store) = &self.history else {
            return;
        };
        let Some(entry) = CampaignHistoryEntry::from_state(&self.state, chrono::Utc::now()) else {
            return;
        };
        let event = match store.record(&entry) {
            Ok(()) => {
                log::info!("history: recorded campaign {}", entry.id);
                SessionEvent::HistoryRecorded { campaign_id: entry.id }
            }
            Err(e) => {
                log::warn!("history: write failed, continuing without it: {e}");
                SessionEvent::HistoryWriteFailed { reason: e.to_string() }
            }
        };
        self.journal.record(Phase::Results, event);
    }

    /// Back to a pristine session. The RNG streams keep advancing so a
    /// replay in the same process gets fresh draws.
    pub fn reset(&mut self) {
        self.state.apply(GameCommand::ResetGame);
        self.journal.clear();
        self.journal.record(Phase::Home, SessionEvent::SessionReset);
        log::info!("session: reset");
    }

    // ── Read-only views ────────────────────────────────────────

    /// Run a phase formula on the current inputs without committing.
    pub fn preview(&mut self, phase: Phase) -> SimResult<Preview> {
        self.ensure_active()?;
        preview::preview(&self.config, &self.state, phase, self.rng_bank.stream(RngSlot::Preview))
    }

    pub fn achievements(&self) -> Vec<Achievement> {
        achievements::unlocked(&self.state.metrics_snapshot())
    }

    pub fn recommendations(&self, phase: Phase) -> Vec<Recommendation> {
        advisor::recommendations_for(&self.state, phase)
    }

    // ── Helpers ────────────────────────────────────────────────

    fn ensure_open(&self, phase: Phase, committed: bool) -> SimResult<()> {
        if self.state.current_phase != phase {
            return Err(SimError::TransitionBlocked {
                from: self.state.current_phase,
                to: phase,
                reason: format!("{phase} strategy can only be edited during {phase}"),
            });
        }
        if committed {
            return Err(SimError::InvalidInput {
                field: "strategy",
                reason: format!("{phase} results are already committed"),
            });
        }
        Ok(())
    }

    fn record_perturbations(
        &mut self,
        phase: Phase,
        events: &[&'static MarketEvent],
        feedback: Vec<String>,
    ) -> PhaseReport {
        let mut shown = Vec::with_capacity(events.len());
        for ev in events {
            self.commit(GameCommand::RecordMarketEvent { event_id: ev.id.to_string() });
            self.journal.record(
                phase,
                SessionEvent::MarketEventShown {
                    phase,
                    event_id: ev.id.to_string(),
                    title: ev.title.to_string(),
                    polarity: ev.polarity,
                },
            );
            log::info!("{phase}: market event {} ({:?})", ev.id, ev.polarity);
            shown.push(ShownEvent::from(*ev));
        }
        self.journal.record(phase, SessionEvent::FeedbackIssued { phase, messages: feedback.clone() });
        PhaseReport { feedback, market_events: shown }
    }
}
