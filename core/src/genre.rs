//! App genres and their modifier bundles.
//!
//! A genre is chosen once per session and its multipliers flow through all
//! three phases. The formulas cap how far a genre can hurt a metric (see
//! `GenreCaps` in config.rs); the raw bundles here are uncapped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    #[serde(rename = "Casual Game")]
    CasualGame,
    #[serde(rename = "Social App")]
    SocialApp,
    #[serde(rename = "Education App")]
    EducationApp,
    #[serde(rename = "Fitness & Health")]
    FitnessHealth,
    #[serde(rename = "Productivity App")]
    ProductivityApp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetentionModifiers {
    pub d1: f64,
    pub d7: f64,
    pub d30: f64,
}

/// Multiplicative modifiers a genre applies across the campaign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenreMetrics {
    pub cpi: f64,
    pub retention: RetentionModifiers,
    pub ad_revenue: f64,
    pub iap_revenue: f64,
    pub session_length: f64,
}

impl GenreMetrics {
    /// No-op bundle, used when formulas run before a genre is chosen.
    pub const NEUTRAL: GenreMetrics = GenreMetrics {
        cpi: 1.0,
        retention: RetentionModifiers { d1: 1.0, d7: 1.0, d30: 1.0 },
        ad_revenue: 1.0,
        iap_revenue: 1.0,
        session_length: 1.0,
    };
}

impl Genre {
    pub const ALL: [Genre; 5] = [
        Self::CasualGame,
        Self::SocialApp,
        Self::EducationApp,
        Self::FitnessHealth,
        Self::ProductivityApp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CasualGame => "Casual Game",
            Self::SocialApp => "Social App",
            Self::EducationApp => "Education App",
            Self::FitnessHealth => "Fitness & Health",
            Self::ProductivityApp => "Productivity App",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::CasualGame => {
                "High install rates, strong ad monetization potential, shorter sessions"
            }
            Self::SocialApp => "High engagement, moderate acquisition costs, strong viral potential",
            Self::EducationApp => "Higher user value, longer retention, strong IAP potential",
            Self::FitnessHealth => {
                "High subscription potential, seasonal variations, loyal user base"
            }
            Self::ProductivityApp => "High user value, longer sales cycle, strong B2B potential",
        }
    }

    pub fn metrics(&self) -> GenreMetrics {
        let (cpi, d1, d7, d30, ad_revenue, iap_revenue, session_length) = match self {
            Self::CasualGame      => (0.8, 1.2, 0.9, 0.7, 1.2, 0.8, 0.8),
            Self::SocialApp       => (1.1, 1.3, 1.2, 1.1, 0.7, 0.9, 1.3),
            Self::EducationApp    => (1.2, 0.9, 1.1, 1.3, 0.8, 1.4, 1.1),
            Self::FitnessHealth   => (1.3, 1.0, 1.0, 1.2, 0.6, 1.5, 0.9),
            Self::ProductivityApp => (1.4, 0.8, 1.0, 1.4, 0.5, 1.6, 1.2),
        };
        GenreMetrics {
            cpi,
            retention: RetentionModifiers { d1, d7, d30 },
            ad_revenue,
            iap_revenue,
            session_length,
        }
    }

    /// Display labels for the genre card: (power-ups, power-downs).
    pub fn powers(&self) -> (&'static [&'static str], &'static [&'static str]) {
        match self {
            Self::CasualGame => (
                &["+10% Installs (Viral Effect)", "+5% CTR for Video Ads"],
                &["-5% Retention (Short Sessions)"],
            ),
            Self::SocialApp => (
                &["+15% D1 Retention", "+10% CTR from Sharing"],
                &["+10% Higher CPI"],
            ),
            Self::EducationApp => (
                &["+20% IAP Revenue", "+5% D7 Retention"],
                &["-10% Banner CTR"],
            ),
            Self::FitnessHealth => (
                &["+5% Retention Boost", "+15% ARPDAU"],
                &["-10% Installs"],
            ),
            Self::ProductivityApp => (
                &["+20% Ad Revenue", "+5% Fill Rate"],
                &["-5% Retention"],
            ),
        }
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
