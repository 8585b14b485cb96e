//! Per-phase coaching recommendations.
//!
//! Each rule is a pure predicate over the session record. Rules only look
//! at results their phase has committed; until then they stay silent.

use crate::{
    state::{GameState, Phase},
    strategy::{AdFormat, AdFrequency, NotificationFrequency},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    HighCpi,
    LowCtr,
    NarrowInterests,
    HighBudgetLowRoi,
    NarrowAgeRange,
    PoorRetention,
    ExcessiveNotifications,
    LowEngagement,
    LowArpdau,
    AdFatigueRisk,
    MissingRewardedAds,
}

/// Ages assumed when the player targets by bracket rather than a range.
const FULL_AGE_RANGE: (u8, u8) = (18, 84);

impl Recommendation {
    pub const ALL: [Recommendation; 11] = [
        Self::HighCpi,
        Self::LowCtr,
        Self::NarrowInterests,
        Self::HighBudgetLowRoi,
        Self::NarrowAgeRange,
        Self::PoorRetention,
        Self::ExcessiveNotifications,
        Self::LowEngagement,
        Self::LowArpdau,
        Self::AdFatigueRisk,
        Self::MissingRewardedAds,
    ];

    pub fn phase(&self) -> Phase {
        match self {
            Self::HighCpi
            | Self::LowCtr
            | Self::NarrowInterests
            | Self::HighBudgetLowRoi
            | Self::NarrowAgeRange => Phase::Acquisition,
            Self::PoorRetention | Self::ExcessiveNotifications | Self::LowEngagement => {
                Phase::Retention
            }
            Self::LowArpdau | Self::AdFatigueRisk | Self::MissingRewardedAds => Phase::Monetization,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::HighCpi => "Your CPI is high. Try adjusting your bidding strategy or testing different ad formats.",
            Self::LowCtr => "Your CTR is low. Try different creative formats or target audiences that might be more interested in your app.",
            Self::NarrowInterests => "Broader audience targeting might help you find more potential users. Consider selecting additional interests.",
            Self::HighBudgetLowRoi => "High budget but low ROI. Consider optimizing your targeting before increasing spend.",
            Self::NarrowAgeRange => "Your age targeting might be too narrow. Consider expanding to reach more potential users.",
            Self::PoorRetention => "Your Day 7 retention is low. Consider improving user engagement with more frequent content updates.",
            Self::ExcessiveNotifications => "Frequent notifications might be overwhelming users. Consider reducing frequency to improve retention.",
            Self::LowEngagement => "Short session lengths indicate low engagement. Try adding more engaging content or special events.",
            Self::LowArpdau => "Your ARPDAU is below industry average. Consider optimizing your ad placement or IAP pricing strategy.",
            Self::AdFatigueRisk => "High ad frequency might be causing user fatigue. Consider balancing ad frequency with user experience.",
            Self::MissingRewardedAds => "Rewarded video ads often have high engagement. Consider adding them to your monetization strategy.",
        }
    }

    pub fn applies(&self, s: &GameState) -> bool {
        let p1 = s.phase1_results.as_ref();
        let p2 = s.phase2_results.as_ref();
        let p3 = s.phase3_results.as_ref();
        match self {
            Self::HighCpi => p1.is_some_and(|r| r.cpi > 2.5),
            Self::LowCtr => p1.is_some_and(|r| r.ctr < 0.018),
            Self::NarrowInterests => p1.is_some() && s.audience_targeting.interests.len() < 3,
            Self::HighBudgetLowRoi => p1.is_some_and(|r| s.budget > 1500.0 && r.cpi > 2.0),
            Self::NarrowAgeRange => {
                let (min, max) = s.audience_targeting.age_range.unwrap_or(FULL_AGE_RANGE);
                p1.is_some() && max.saturating_sub(min) < 20
            }
            Self::PoorRetention => p2.is_some_and(|r| r.retention_rates.d7 < 20.0),
            Self::ExcessiveNotifications => {
                p2.is_some()
                    && s.retention_strategy.notification_frequency
                        == Some(NotificationFrequency::Frequent)
            }
            Self::LowEngagement => p2.is_some_and(|r| r.session_length < 10.0),
            Self::LowArpdau => p3.is_some_and(|r| r.arpdau < 0.10),
            Self::AdFatigueRisk => {
                p3.is_some() && s.monetization_strategy.ad_frequency == Some(AdFrequency::High)
            }
            Self::MissingRewardedAds => {
                p3.is_some() && !s.monetization_strategy.ad_formats.contains(&AdFormat::Rewarded)
            }
        }
    }
}

/// Applicable recommendations for one phase, in display order.
pub fn recommendations_for(state: &GameState, phase: Phase) -> Vec<Recommendation> {
    Recommendation::ALL
        .into_iter()
        .filter(|r| r.phase() == phase && r.applies(state))
        .collect()
}
