//! The command surface and the single reducer that applies it.
//!
//! RULE: This is the only place `GameState` fields are assigned.
//! Commands carry no guard logic of their own: the engine checks guards
//! before it dispatches, exactly as the UI disables a button.

use crate::{
    genre::Genre,
    state::{
        AcquisitionResults, AcquisitionStep, FinalResults, GameState, MonetizationResults, Phase,
        RetentionResults,
    },
    strategy::{AudiencePatch, BiddingStrategy, CreativeFormat, MonetizationPatch, RetentionPatch},
    types::Dollars,
};
use serde::{Deserialize, Serialize};

/// All state-changing actions.
/// Variants are never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameCommand {
    SetPhase { phase: Phase },
    SetAcquisitionStep { step: AcquisitionStep },
    SetAppGenre { genre: Genre },
    SetBudget { budget: Dollars },
    SetAudienceTargeting(AudiencePatch),
    SetCreativeSelection { formats: Vec<CreativeFormat> },
    SetBiddingStrategy { strategy: BiddingStrategy },
    SetPhase1Results(AcquisitionResults),
    SetRetentionStrategy(RetentionPatch),
    SetPhase2Results(RetentionResults),
    SetMonetizationStrategy(MonetizationPatch),
    SetPhase3Results(MonetizationResults),
    SetFinalResults(FinalResults),
    RecordMarketEvent { event_id: String },
    ResetGame,
}

impl GameCommand {
    /// Stable name used in the session journal and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SetPhase { .. }             => "SET_PHASE",
            Self::SetAcquisitionStep { .. }   => "SET_ACQUISITION_STEP",
            Self::SetAppGenre { .. }          => "SET_APP_GENRE",
            Self::SetBudget { .. }            => "SET_BUDGET",
            Self::SetAudienceTargeting(_)     => "SET_AUDIENCE_TARGETING",
            Self::SetCreativeSelection { .. } => "SET_CREATIVE_SELECTION",
            Self::SetBiddingStrategy { .. }   => "SET_BIDDING_STRATEGY",
            Self::SetPhase1Results(_)         => "SET_PHASE1_RESULTS",
            Self::SetRetentionStrategy(_)     => "SET_RETENTION_STRATEGY",
            Self::SetPhase2Results(_)         => "SET_PHASE2_RESULTS",
            Self::SetMonetizationStrategy(_)  => "SET_MONETIZATION_STRATEGY",
            Self::SetPhase3Results(_)         => "SET_PHASE3_RESULTS",
            Self::SetFinalResults(_)          => "SET_FINAL_RESULTS",
            Self::RecordMarketEvent { .. }    => "RECORD_MARKET_EVENT",
            Self::ResetGame                   => "RESET_GAME",
        }
    }

    /// Parse one JSON command. Unknown or malformed commands yield `None`
    /// and must be treated as no-ops by the caller.
    pub fn parse(json: &str) -> Option<GameCommand> {
        match serde_json::from_str(json) {
            Ok(cmd) => Some(cmd),
            Err(e) => {
                log::warn!("ignoring unrecognized command: {e}");
                None
            }
        }
    }
}

impl GameState {
    /// Apply one command. Pure with respect to everything but `self`.
    pub fn apply(&mut self, command: GameCommand) {
        match command {
            GameCommand::SetPhase { phase } => {
                self.current_phase = phase;
            }
            GameCommand::SetAcquisitionStep { step } => {
                self.acquisition_step = step;
            }
            GameCommand::SetAppGenre { genre } => {
                if let Some(existing) = self.app_genre {
                    log::warn!("genre already set to {existing}; ignoring {genre}");
                    return;
                }
                self.app_genre = Some(genre);
                self.genre_metrics = Some(genre.metrics());
            }
            GameCommand::SetBudget { budget } => {
                if self.phase1_results.is_some() {
                    log::warn!("budget is frozen once acquisition results are committed");
                    return;
                }
                self.budget = budget;
            }
            GameCommand::SetAudienceTargeting(patch) => {
                self.audience_targeting.merge(patch);
            }
            GameCommand::SetCreativeSelection { formats } => {
                self.creative_selection.set_formats(formats);
            }
            GameCommand::SetBiddingStrategy { strategy } => {
                self.bidding_strategy = Some(strategy);
            }
            GameCommand::SetPhase1Results(results) => {
                self.phase1_results = Some(results);
            }
            GameCommand::SetRetentionStrategy(patch) => {
                self.retention_strategy.merge(patch);
            }
            GameCommand::SetPhase2Results(results) => {
                self.phase2_results = Some(results);
            }
            GameCommand::SetMonetizationStrategy(patch) => {
                self.monetization_strategy.merge(patch);
            }
            GameCommand::SetPhase3Results(results) => {
                self.phase3_results = Some(results);
            }
            GameCommand::SetFinalResults(results) => {
                self.final_results = Some(results);
            }
            GameCommand::RecordMarketEvent { event_id } => {
                if !self.shown_events.contains(&event_id) {
                    self.shown_events.push(event_id);
                }
            }
            GameCommand::ResetGame => {
                *self = GameState::default();
            }
        }
    }
}
