//! Achievement badges as pure predicates over a `MetricsSnapshot`.

use crate::state::MetricsSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    RoasRookie,
    RetentionMaster,
    AdMonetizationPro,
    CreativeGenius,
    EngagementExpert,
}

impl Achievement {
    pub const ALL: [Achievement; 5] = [
        Self::RoasRookie,
        Self::RetentionMaster,
        Self::AdMonetizationPro,
        Self::CreativeGenius,
        Self::EngagementExpert,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::RoasRookie => "ROAS Rookie",
            Self::RetentionMaster => "Retention Master",
            Self::AdMonetizationPro => "Ad Monetization Pro",
            Self::CreativeGenius => "Creative Genius",
            Self::EngagementExpert => "Engagement Expert",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::RoasRookie => "Achieve a ROAS of at least 1.0",
            Self::RetentionMaster => "Achieve Day-7 retention of at least 30%",
            Self::AdMonetizationPro => "Generate ARPDAU of at least $0.50",
            Self::CreativeGenius => "Achieve a CTR of at least 5%",
            Self::EngagementExpert => "Achieve sessions of at least 20 minutes",
        }
    }

    /// Missing metrics never unlock anything.
    pub fn unlocked(&self, m: &MetricsSnapshot) -> bool {
        match self {
            Self::RoasRookie => m.roas.is_some_and(|v| v >= 1.0),
            Self::RetentionMaster => m.d7.is_some_and(|v| v >= 30.0),
            Self::AdMonetizationPro => m.arpdau.is_some_and(|v| v >= 0.50),
            Self::CreativeGenius => m.ctr.is_some_and(|v| v >= 0.05),
            Self::EngagementExpert => m.session_length.is_some_and(|v| v >= 20.0),
        }
    }
}

pub fn unlocked(m: &MetricsSnapshot) -> Vec<Achievement> {
    Achievement::ALL.into_iter().filter(|a| a.unlocked(m)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_unlocks_nothing() {
        assert!(unlocked(&MetricsSnapshot::default()).is_empty());
    }

    #[test]
    fn thresholds_are_inclusive() {
        let m = MetricsSnapshot {
            roas: Some(1.0),
            d7: Some(30.0),
            ctr: Some(0.049),
            ..Default::default()
        };
        assert_eq!(unlocked(&m), vec![Achievement::RoasRookie, Achievement::RetentionMaster]);
    }
}
