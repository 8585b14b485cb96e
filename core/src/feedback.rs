//! Coaching-message selection.
//!
//! Each category carries a weight that rises when its metric crosses the
//! configured threshold. A selection rolls `u × total_weight`, walks the
//! categories in fixed order and takes the first whose cumulative weight
//! exceeds the roll, so every roll lands on some category. Duplicate
//! messages are skipped; the attempt budget bounds the loop.

use crate::{
    config::FeedbackBalance,
    rng::RandomSource,
    types::{Dollars, Percent, Ratio},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackCategory {
    CtrLow,
    AudienceBroad,
    CreativePerformance,
    Retention,
    Monetization,
    Positive,
}

impl FeedbackCategory {
    /// Walk order for the cumulative-weight roll. Never reorder.
    pub const ORDER: [FeedbackCategory; 6] = [
        Self::CtrLow,
        Self::AudienceBroad,
        Self::CreativePerformance,
        Self::Retention,
        Self::Monetization,
        Self::Positive,
    ];

    pub fn messages(&self) -> &'static [&'static str] {
        match self {
            Self::CtrLow => &[
                "Your CTR is underperforming. Try increasing your video ad share for better engagement.",
                "Users aren't clicking enough; consider adding more attractive creative formats.",
                "Your CTR is low. Have you considered switching to a different geo or adjusting creative tone?",
                "Try A/B testing creative styles to improve CTR.",
                "CTR might improve with more audience-specific messaging. Try adjusting ad copy.",
            ],
            Self::AudienceBroad => &[
                "Consider expanding your target age group to increase reach.",
                "Your audience targeting is too narrow. Try adding another interest for better scale.",
                "Expanding audience targeting could reduce CPI and increase installs.",
                "Consider testing different audience segments for better CTR.",
                "Reaching more users might improve ad efficiency and lower CPI.",
            ],
            Self::CreativePerformance => &[
                "Video ads are outperforming banners. Consider increasing the video split.",
                "Playable ads are delivering higher CVR. Consider using more playable formats.",
                "Static banners aren't performing well. Switch to video or interactive formats.",
                "Interactive ads show better engagement. Try increasing their share.",
                "Consider testing new creative variations to improve performance.",
            ],
            Self::Retention => &[
                "Retention dropped after D1. Try increasing push notification frequency.",
                "Engagement might improve with more frequent content updates.",
                "Users are churning too early. Try reducing ad frequency to improve session length.",
                "Consider adding more engaging features to improve retention.",
                "Try implementing a daily reward system to boost retention.",
            ],
            Self::Monetization => &[
                "ARPDAU is underperforming. Consider increasing rewarded ad frequency.",
                "Interstitial ads might be too frequent. Try reducing them to improve retention.",
                "IAP revenue could increase with better pricing tiers.",
                "Try optimizing ad placement to improve viewability.",
                "Consider implementing dynamic pricing for IAPs.",
            ],
            Self::Positive => &[
                "Nice work! Your video ad split is driving high CTR.",
                "Your retention is strong. Keep up the engagement!",
                "Great work: ROAS is improving with the current ad format strategy.",
                "Excellent balance of ad formats and frequency!",
                "Your monetization strategy is showing great results!",
            ],
        }
    }
}

/// The metrics a phase knows about when it asks for feedback.
/// `None` never triggers a category.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeedbackMetrics {
    pub ctr: Option<Ratio>,
    pub cpi: Option<Dollars>,
    pub cvr: Option<Ratio>,
    pub d7: Option<Percent>,
    pub arpdau: Option<Dollars>,
    pub roas: Option<f64>,
}

fn below(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v < threshold)
}

fn above(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v > threshold)
}

/// Weight per category, in `FeedbackCategory::ORDER`.
pub fn category_weights(
    cfg: &FeedbackBalance,
    m: &FeedbackMetrics,
) -> [(FeedbackCategory, f64); 6] {
    let t = &cfg.thresholds;
    let w = &cfg.weights;
    [
        (FeedbackCategory::CtrLow, w.ctr_low.pick(below(m.ctr, t.ctr_low))),
        (FeedbackCategory::AudienceBroad, w.audience_broad.pick(above(m.cpi, t.cpi_high))),
        (
            FeedbackCategory::CreativePerformance,
            w.creative_performance.pick(below(m.cvr, t.cvr_low)),
        ),
        (FeedbackCategory::Retention, w.retention.pick(below(m.d7, t.d7_low))),
        (FeedbackCategory::Monetization, w.monetization.pick(below(m.arpdau, t.arpdau_low))),
        (FeedbackCategory::Positive, w.positive.pick(above(m.roas, t.roas_good))),
    ]
}

/// Map a roll in [0,1) onto a category by cumulative weight.
pub fn category_for_roll(weights: &[(FeedbackCategory, f64)], roll: f64) -> Option<FeedbackCategory> {
    let total: f64 = weights.iter().map(|(_, w)| w.max(0.0)).sum();
    if total <= 0.0 {
        return None;
    }
    let target = roll * total;
    let mut cumulative = 0.0;
    for (category, weight) in weights {
        cumulative += weight.max(0.0);
        if target < cumulative {
            return Some(*category);
        }
    }
    // Float slop at the very top of the range.
    weights.iter().rev().find(|(_, w)| *w > 0.0).map(|(c, _)| *c)
}

/// Choose between `min_messages` and `max_messages` distinct messages.
pub fn select_feedback(
    cfg: &FeedbackBalance,
    metrics: &FeedbackMetrics,
    rng: &mut impl RandomSource,
) -> Vec<String> {
    let span = cfg.max_messages.saturating_sub(cfg.min_messages) + 1;
    let wanted = cfg.min_messages + rng.pick_index(span);
    let weights = category_weights(cfg, metrics);

    let mut chosen: Vec<String> = Vec::with_capacity(wanted);
    let mut attempts = 0;
    while chosen.len() < wanted && attempts < cfg.max_attempts {
        attempts += 1;
        let Some(category) = category_for_roll(&weights, rng.next_f64()) else {
            break;
        };
        let pool = category.messages();
        let message = pool[rng.pick_index(pool.len())];
        if !chosen.iter().any(|m| m == message) {
            chosen.push(message.to_string());
        }
    }
    log::debug!("feedback: {} of {wanted} messages after {attempts} rolls", chosen.len());
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::BalanceConfig, rng::SequenceRng};

    #[test]
    fn low_ctr_raises_its_weight() {
        let cfg = BalanceConfig::canonical().feedback;
        let low = category_weights(&cfg, &FeedbackMetrics { ctr: Some(0.01), ..Default::default() });
        let ok = category_weights(&cfg, &FeedbackMetrics { ctr: Some(0.05), ..Default::default() });
        assert_eq!(low[0].1, 0.4);
        assert_eq!(ok[0].1, 0.1);
    }

    #[test]
    fn missing_metric_never_triggers() {
        let cfg = BalanceConfig::canonical().feedback;
        let w = category_weights(&cfg, &FeedbackMetrics::default());
        assert!(w.iter().take(5).all(|(_, v)| *v == 0.1));
        assert_eq!(w[5].1, 0.2);
    }

    #[test]
    fn roll_walks_in_fixed_order() {
        let weights = [
            (FeedbackCategory::CtrLow, 1.0),
            (FeedbackCategory::Positive, 1.0),
        ];
        assert_eq!(category_for_roll(&weights, 0.0), Some(FeedbackCategory::CtrLow));
        assert_eq!(category_for_roll(&weights, 0.49), Some(FeedbackCategory::CtrLow));
        assert_eq!(category_for_roll(&weights, 0.5), Some(FeedbackCategory::Positive));
        assert_eq!(category_for_roll(&[(FeedbackCategory::CtrLow, 0.0)], 0.3), None);
    }

    #[test]
    fn constant_rng_terminates_with_one_message() {
        // Every roll picks the same message, so duplicates exhaust the budget.
        let cfg = BalanceConfig::canonical().feedback;
        let mut rng = SequenceRng::constant(0.0);
        let picked = select_feedback(&cfg, &FeedbackMetrics::default(), &mut rng);
        assert_eq!(picked.len(), 1);
    }
}
