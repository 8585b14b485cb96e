//! Strategy preview: run a phase formula on the current inputs without
//! committing anything.
//!
//! RULE: Previews take `&GameState` and draw only from the preview stream.
//! Nothing here can change committed results or shift the committed RNG
//! streams.

use crate::{
    config::BalanceConfig,
    error::{SimError, SimResult},
    formulas::{
        acquisition_feedback, monetization_feedback, retention_feedback, simulate_acquisition,
        simulate_monetization, simulate_retention, AcquisitionInput,
    },
    rng::RandomSource,
    state::{AcquisitionResults, GameState, MonetizationResults, Phase, RetentionResults},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PreviewResults {
    Acquisition(AcquisitionResults),
    Retention(RetentionResults),
    Monetization(MonetizationResults),
}

/// One metric compared against its benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCheck {
    pub metric: String,
    pub value: f64,
    pub target: f64,
    /// False for cost metrics, where lower is better.
    pub higher_is_better: bool,
}

impl TargetCheck {
    fn new(metric: &str, value: f64, target: f64, higher_is_better: bool) -> Self {
        Self { metric: metric.to_string(), value, target, higher_is_better }
    }

    pub fn on_target(&self) -> bool {
        if self.higher_is_better {
            self.value >= self.target
        } else {
            self.value <= self.target
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub results: PreviewResults,
    pub feedback: Vec<String>,
    pub targets: Vec<TargetCheck>,
}

pub fn preview(
    cfg: &BalanceConfig,
    state: &GameState,
    phase: Phase,
    rng: &mut impl RandomSource,
) -> SimResult<Preview> {
    match phase {
        Phase::Acquisition => Ok(preview_acquisition(cfg, state, rng)),
        Phase::Retention => preview_retention(cfg, state, rng),
        Phase::Monetization => preview_monetization(cfg, state, rng),
        other => Err(SimError::InvalidInput {
            field: "phase",
            reason: format!("{other} has no simulation to preview"),
        }),
    }
}

pub fn preview_acquisition(
    cfg: &BalanceConfig,
    state: &GameState,
    rng: &mut impl RandomSource,
) -> Preview {
    let a = &state.audience_targeting;
    let input = AcquisitionInput {
        budget: state.budget,
        age_group: a.age_group,
        interests: &a.interests,
        formats: &state.creative_selection.formats,
        bidding: state.bidding_strategy,
        genre: state.modifiers(),
    };
    let results = simulate_acquisition(cfg, &input, rng);
    let feedback = acquisition_feedback(cfg, &results, rng);
    let t = &cfg.preview;
    let targets = vec![
        TargetCheck::new("ctr", results.ctr, t.ctr, true),
        TargetCheck::new("cpi", results.cpi, t.cpi, false),
        TargetCheck::new(
            "installs",
            results.installs as f64,
            (state.budget / t.cpi).floor(),
            true,
        ),
    ];
    Preview { results: PreviewResults::Acquisition(results), feedback, targets }
}

pub fn preview_retention(
    cfg: &BalanceConfig,
    state: &GameState,
    rng: &mut impl RandomSource,
) -> SimResult<Preview> {
    let installs = state
        .phase1_results
        .map(|r| r.installs)
        .ok_or_else(|| SimError::InvalidInput {
            field: "phase1_results",
            reason: "retention needs committed acquisition results".into(),
        })?;
    let choices = state.retention_strategy.complete().ok_or_else(|| SimError::InvalidInput {
        field: "retention_strategy",
        reason: format!("missing {}", state.retention_strategy.missing_fields().join(", ")),
    })?;

    let results = simulate_retention(cfg, installs, &choices, &state.modifiers());
    let feedback = retention_feedback(cfg, &results, rng);
    let t = &cfg.preview;
    let targets = vec![
        TargetCheck::new("d1", results.retention_rates.d1, t.d1, true),
        TargetCheck::new("d7", results.retention_rates.d7, t.d7, true),
        TargetCheck::new(
            "dau",
            results.dau as f64,
            (installs as f64 * t.dau_ratio).floor(),
            true,
        ),
    ];
    Ok(Preview { results: PreviewResults::Retention(results), feedback, targets })
}

pub fn preview_monetization(
    cfg: &BalanceConfig,
    state: &GameState,
    rng: &mut impl RandomSource,
) -> SimResult<Preview> {
    let dau = state
        .phase2_results
        .map(|r| r.dau)
        .ok_or_else(|| SimError::InvalidInput {
            field: "phase2_results",
            reason: "monetization needs committed retention results".into(),
        })?;
    let choices = state.monetization_strategy.complete().ok_or_else(|| SimError::InvalidInput {
        field: "monetization_strategy",
        reason: format!("missing {}", state.monetization_strategy.missing_fields().join(", ")),
    })?;

    let results = simulate_monetization(cfg, dau, &choices, &state.modifiers(), rng);
    let feedback = monetization_feedback(cfg, &results, rng);
    let t = &cfg.preview;
    let targets = vec![
        TargetCheck::new("arpdau", results.arpdau, t.arpdau, true),
        TargetCheck::new("fill_rate", results.fill_rate, t.fill_rate, true),
        TargetCheck::new("roas", results.projected_roas, t.roas, true),
    ];
    Ok(Preview { results: PreviewResults::Monetization(results), feedback, targets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::SequenceRng;

    #[test]
    fn cost_targets_invert() {
        let cheap = TargetCheck::new("cpi", 1.2, 1.5, false);
        let pricey = TargetCheck::new("cpi", 1.8, 1.5, false);
        assert!(cheap.on_target());
        assert!(!pricey.on_target());
    }

    #[test]
    fn retention_preview_needs_acquisition() {
        let cfg = BalanceConfig::canonical();
        let state = GameState::default();
        let err = preview(&cfg, &state, Phase::Retention, &mut SequenceRng::constant(0.5));
        assert!(matches!(err, Err(SimError::InvalidInput { field: "phase1_results", .. })));
    }

    #[test]
    fn home_has_nothing_to_preview() {
        let cfg = BalanceConfig::canonical();
        let state = GameState::default();
        assert!(preview(&cfg, &state, Phase::Home, &mut SequenceRng::constant(0.5)).is_err());
    }
}
