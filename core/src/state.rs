//! The session record and its transition guards.
//!
//! RULE: `GameState` is only ever mutated through `GameState::apply`
//! (command.rs). Guards here are read-only queries: the presentation layer
//! uses them to disable actions, and the engine checks them before it
//! dispatches.

use crate::{
    genre::{Genre, GenreMetrics},
    strategy::{
        AudienceTargeting, BiddingStrategy, CreativeSelection, MonetizationStrategy,
        RetentionStrategy,
    },
    types::{Dollars, Percent, Ratio},
};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_BUDGET: Dollars = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Home,
    GenreSelection,
    Acquisition,
    Retention,
    Monetization,
    Results,
}

impl Phase {
    /// The forward edge out of this phase, if any.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Self::Home => Some(Self::GenreSelection),
            Self::GenreSelection => Some(Self::Acquisition),
            Self::Acquisition => Some(Self::Retention),
            Self::Retention => Some(Self::Monetization),
            Self::Monetization => Some(Self::Results),
            Self::Results => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::GenreSelection => "genre-selection",
            Self::Acquisition => "acquisition",
            Self::Retention => "retention",
            Self::Monetization => "monetization",
            Self::Results => "results",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Internal sub-steps of the acquisition phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionStep {
    Budget,
    Audience,
    Creative,
    Bidding,
}

impl AcquisitionStep {
    pub fn next(&self) -> Option<AcquisitionStep> {
        match self {
            Self::Budget => Some(Self::Audience),
            Self::Audience => Some(Self::Creative),
            Self::Creative => Some(Self::Bidding),
            Self::Bidding => None,
        }
    }

    pub fn previous(&self) -> Option<AcquisitionStep> {
        match self {
            Self::Budget => None,
            Self::Audience => Some(Self::Budget),
            Self::Creative => Some(Self::Audience),
            Self::Bidding => Some(Self::Creative),
        }
    }
}

// ── Result records ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResults {
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: Ratio,
    pub installs: u64,
    pub cvr: Ratio,
    pub cpi: Dollars,
    pub spend: Dollars,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetentionRates {
    pub d1: Percent,
    pub d7: Percent,
    pub d30: Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetentionResults {
    pub retention_rates: RetentionRates,
    pub dau: u64,
    /// Average session length in minutes.
    pub session_length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonetizationResults {
    pub arpdau: Dollars,
    pub ad_revenue: Dollars,
    pub iap_revenue: Dollars,
    pub fill_rate: Ratio,
    pub ecpm: Dollars,
    /// Projected ROAS over the configured horizon, floored.
    pub projected_roas: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResults {
    pub total_spend: Dollars,
    pub total_revenue: Dollars,
    /// Revenue / spend, rounded to 2 decimals.
    pub roas: f64,
    /// Display order is insertion order.
    pub insights: Vec<String>,
}

// ── Session state ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub current_phase: Phase,
    pub acquisition_step: AcquisitionStep,
    pub app_genre: Option<Genre>,
    pub genre_metrics: Option<GenreMetrics>,
    pub budget: Dollars,
    pub audience_targeting: AudienceTargeting,
    pub creative_selection: CreativeSelection,
    pub bidding_strategy: Option<BiddingStrategy>,
    pub phase1_results: Option<AcquisitionResults>,
    pub retention_strategy: RetentionStrategy,
    pub phase2_results: Option<RetentionResults>,
    pub monetization_strategy: MonetizationStrategy,
    pub phase3_results: Option<MonetizationResults>,
    pub final_results: Option<FinalResults>,
    /// Ids of market events already shown this session.
    pub shown_events: Vec<String>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            current_phase: Phase::Home,
            acquisition_step: AcquisitionStep::Budget,
            app_genre: None,
            genre_metrics: None,
            budget: DEFAULT_BUDGET,
            audience_targeting: AudienceTargeting::default(),
            creative_selection: CreativeSelection::default(),
            bidding_strategy: None,
            phase1_results: None,
            retention_strategy: RetentionStrategy::default(),
            phase2_results: None,
            monetization_strategy: MonetizationStrategy::default(),
            phase3_results: None,
            final_results: None,
            shown_events: Vec::new(),
        }
    }
}

/// Why a requested transition is not available yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardViolation {
    pub from: Phase,
    pub to: Phase,
    pub reason: String,
}

impl From<GuardViolation> for crate::error::SimError {
    fn from(v: GuardViolation) -> Self {
        crate::error::SimError::TransitionBlocked {
            from: v.from,
            to: v.to,
            reason: v.reason,
        }
    }
}

impl GameState {
    /// Genre modifiers in effect; neutral until a genre is chosen.
    pub fn modifiers(&self) -> GenreMetrics {
        self.genre_metrics.unwrap_or(GenreMetrics::NEUTRAL)
    }

    fn blocked(&self, to: Phase, reason: impl Into<String>) -> Result<(), GuardViolation> {
        Err(GuardViolation {
            from: self.current_phase,
            to,
            reason: reason.into(),
        })
    }

    /// Whether the forward transition to `to` is currently allowed.
    /// Returning to `home` is never a transition; only a reset gets there.
    pub fn can_enter(&self, to: Phase) -> Result<(), GuardViolation> {
        if self.current_phase.next() != Some(to) {
            return self.blocked(to, "not the next phase");
        }
        match to {
            Phase::Home => self.blocked(to, "only a reset returns home"),
            Phase::GenreSelection => Ok(()),
            Phase::Acquisition => {
                if self.app_genre.is_none() {
                    return self.blocked(to, "select an app genre first");
                }
                Ok(())
            }
            Phase::Retention => {
                if self.phase1_results.is_none() {
                    return self.blocked(to, "choose a bidding strategy to launch the campaign");
                }
                Ok(())
            }
            Phase::Monetization => {
                let missing = self.retention_strategy.missing_fields();
                if !missing.is_empty() {
                    return self.blocked(to, format!("retention strategy incomplete: {}", missing.join(", ")));
                }
                if self.phase2_results.is_none() {
                    return self.blocked(to, "calculate retention results first");
                }
                Ok(())
            }
            Phase::Results => {
                let missing = self.monetization_strategy.missing_fields();
                if !missing.is_empty() {
                    return self.blocked(to, format!("monetization strategy incomplete: {}", missing.join(", ")));
                }
                if self.phase3_results.is_none() {
                    return self.blocked(to, "calculate monetization results first");
                }
                Ok(())
            }
        }
    }

    /// Whether "continue" is enabled on the current acquisition sub-step.
    pub fn can_continue_acquisition(&self) -> Result<(), GuardViolation> {
        let here = Phase::Acquisition;
        if self.current_phase != here {
            return self.blocked(here, "not in the acquisition phase");
        }
        match self.acquisition_step {
            AcquisitionStep::Budget => {
                if self.budget <= 0.0 {
                    return self.blocked(here, "set a budget");
                }
                Ok(())
            }
            AcquisitionStep::Audience => {
                let a = &self.audience_targeting;
                if a.age_group.is_none() && a.age_range.is_none() {
                    return self.blocked(here, "choose an age group");
                }
                if a.interests.is_empty() {
                    return self.blocked(here, "choose at least one interest");
                }
                Ok(())
            }
            AcquisitionStep::Creative => {
                if self.creative_selection.formats.is_empty() {
                    return self.blocked(here, "choose at least one creative format");
                }
                Ok(())
            }
            AcquisitionStep::Bidding => {
                self.blocked(here, "bidding is the final step; choosing a strategy launches the campaign")
            }
        }
    }

    /// Whether every acquisition input is still in place for launch.
    /// Earlier steps stay editable, so bidding re-checks them all.
    pub fn can_launch(&self) -> Result<(), GuardViolation> {
        let to = Phase::Retention;
        if self.budget <= 0.0 {
            return self.blocked(to, "set a budget");
        }
        let a = &self.audience_targeting;
        if a.age_group.is_none() && a.age_range.is_none() {
            return self.blocked(to, "choose an age group");
        }
        if a.interests.is_empty() {
            return self.blocked(to, "choose at least one interest");
        }
        if self.creative_selection.formats.is_empty() {
            return self.blocked(to, "choose at least one creative format");
        }
        Ok(())
    }

    /// Whether the retention "calculate" action is enabled.
    pub fn can_calculate_retention(&self) -> Result<(), GuardViolation> {
        let here = Phase::Retention;
        if self.current_phase != here {
            return self.blocked(here, "not in the retention phase");
        }
        if self.phase2_results.is_some() {
            return self.blocked(here, "retention results already committed");
        }
        let missing = self.retention_strategy.missing_fields();
        if !missing.is_empty() {
            return self.blocked(here, format!("retention strategy incomplete: {}", missing.join(", ")));
        }
        Ok(())
    }

    /// Whether the monetization "calculate" action is enabled.
    pub fn can_calculate_monetization(&self) -> Result<(), GuardViolation> {
        let here = Phase::Monetization;
        if self.current_phase != here {
            return self.blocked(here, "not in the monetization phase");
        }
        if self.phase3_results.is_some() {
            return self.blocked(here, "monetization results already committed");
        }
        let missing = self.monetization_strategy.missing_fields();
        if !missing.is_empty() {
            return self.blocked(here, format!("monetization strategy incomplete: {}", missing.join(", ")));
        }
        Ok(())
    }

    /// Flatten the committed results into the snapshot predicates read.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        let p1 = self.phase1_results;
        let p2 = self.phase2_results;
        let p3 = self.phase3_results;
        MetricsSnapshot {
            budget: self.budget,
            ctr: p1.map(|r| r.ctr),
            cvr: p1.map(|r| r.cvr),
            cpi: p1.map(|r| r.cpi),
            installs: p1.map(|r| r.installs),
            d1: p2.map(|r| r.retention_rates.d1),
            d7: p2.map(|r| r.retention_rates.d7),
            d30: p2.map(|r| r.retention_rates.d30),
            dau: p2.map(|r| r.dau),
            session_length: p2.map(|r| r.session_length),
            arpdau: p3.map(|r| r.arpdau),
            roas: self
                .final_results
                .as_ref()
                .map(|f| f.roas)
                .or(p3.map(|r| r.projected_roas)),
            total_revenue: self.final_results.as_ref().map(|f| f.total_revenue),
        }
    }
}

/// A flat, read-only view of whatever metrics exist so far.
///
/// `None` means the phase that produces the metric has not committed yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub budget: Dollars,
    pub ctr: Option<Ratio>,
    pub cvr: Option<Ratio>,
    pub cpi: Option<Dollars>,
    pub installs: Option<u64>,
    pub d1: Option<Percent>,
    pub d7: Option<Percent>,
    pub d30: Option<Percent>,
    pub dau: Option<u64>,
    pub session_length: Option<f64>,
    pub arpdau: Option<Dollars>,
    pub roas: Option<f64>,
    pub total_revenue: Option<Dollars>,
}
