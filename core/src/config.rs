//! The balance table: every tunable constant the formulas use.
//!
//! RULE: No formula hard-codes a magic number that a designer might want to
//! tune. Constants live here, grouped by phase, so a balance pass never
//! touches the algorithms.
//!
//! `BalanceConfig::canonical()` is the built-in table. A JSON file of the
//! same shape can replace it wholesale via `BalanceConfig::load`.

use crate::strategy::{
    AdFormat, AdFrequency, AgeGroup, BiddingStrategy, ContentUpdates, EngagementSpend,
    IapPricing, Interest, NotificationFrequency,
};
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A half-open uniform sampling band `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

/// Per-day multipliers applied to the D1/D7/D30 retention rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateMultipliers {
    pub d1: f64,
    pub d7: f64,
    pub d30: f64,
}

impl RateMultipliers {
    pub const IDENTITY: RateMultipliers = RateMultipliers { d1: 1.0, d7: 1.0, d30: 1.0 };
}

/// One value per low/medium/high tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelTable {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl LevelTable {
    pub fn for_frequency(&self, f: AdFrequency) -> f64 {
        match f {
            AdFrequency::Low => self.low,
            AdFrequency::Medium => self.medium,
            AdFrequency::High => self.high,
        }
    }

    pub fn for_engagement(&self, e: EngagementSpend) -> f64 {
        match e {
            EngagementSpend::Low => self.low,
            EngagementSpend::Medium => self.medium,
            EngagementSpend::High => self.high,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BidEffect {
    pub cpi: f64,
    pub ctr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiddingTable {
    pub high: BidEffect,
    pub moderate: BidEffect,
    pub low: BidEffect,
}

impl BiddingTable {
    pub fn effect(&self, strategy: BiddingStrategy) -> BidEffect {
        match strategy {
            BiddingStrategy::High => self.high,
            BiddingStrategy::Moderate => self.moderate,
            BiddingStrategy::Low => self.low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionBalance {
    pub base_cpi: f64,
    pub ctr_band: Band,
    pub cvr_band: Band,
    /// Video share at or above which the format-synergy bonus applies.
    pub video_share_threshold: f64,
    pub video_ctr_bonus: f64,
    pub video_cvr_bonus: f64,
    pub ctr_floor: f64,
    pub age_cpi: BTreeMap<AgeGroup, f64>,
    pub interest_cpi: BTreeMap<Interest, f64>,
    pub bidding: BiddingTable,
    pub budget_min: f64,
    pub budget_max: f64,
    pub budget_step: f64,
}

impl AcquisitionBalance {
    /// Unknown brackets fall back to the 25-34 multiplier.
    pub fn age_multiplier(&self, age: Option<AgeGroup>) -> f64 {
        let key = age.unwrap_or(AgeGroup::Age25To34);
        self.age_cpi
            .get(&key)
            .or_else(|| self.age_cpi.get(&AgeGroup::Age25To34))
            .copied()
            .unwrap_or(1.0)
    }

    /// Mean CPI multiplier of the selected interests; 1.0 when none.
    pub fn interest_multiplier<'a, I>(&self, interests: I) -> f64
    where
        I: IntoIterator<Item = &'a Interest>,
    {
        let (sum, n) = interests
            .into_iter()
            .map(|i| self.interest_cpi.get(i).copied().unwrap_or(1.0))
            .fold((0.0, 0usize), |(s, n), m| (s + m, n + 1));
        if n == 0 { 1.0 } else { sum / n as f64 }
    }

    pub fn budget_is_valid(&self, budget: f64) -> bool {
        if !budget.is_finite() || budget < self.budget_min || budget > self.budget_max {
            return false;
        }
        let steps = (budget - self.budget_min) / self.budget_step;
        (steps - steps.round()).abs() < 1e-9
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NotificationTable {
    pub none: RateMultipliers,
    pub occasional: RateMultipliers,
    pub frequent: RateMultipliers,
}

impl NotificationTable {
    pub fn get(&self, f: NotificationFrequency) -> RateMultipliers {
        match f {
            NotificationFrequency::None => self.none,
            NotificationFrequency::Occasional => self.occasional,
            NotificationFrequency::Frequent => self.frequent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentTable {
    pub rare: RateMultipliers,
    pub regular: RateMultipliers,
    pub frequent: RateMultipliers,
}

impl ContentTable {
    pub fn get(&self, c: ContentUpdates) -> RateMultipliers {
        match c {
            ContentUpdates::Rare => self.rare,
            ContentUpdates::Regular => self.regular,
            ContentUpdates::Frequent => self.frequent,
        }
    }
}

/// Session-length multipliers per content-update tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentSessionTable {
    pub rare: f64,
    pub regular: f64,
    pub frequent: f64,
}

impl ContentSessionTable {
    pub fn get(&self, c: ContentUpdates) -> f64 {
        match c {
            ContentUpdates::Rare => self.rare,
            ContentUpdates::Regular => self.regular,
            ContentUpdates::Frequent => self.frequent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionBalance {
    /// Starting D1/D7/D30 percentages before any bonus.
    pub base_rates: RateMultipliers,
    /// Lowest percentage any retention rate may report.
    pub floor: f64,
    pub ceiling: f64,
    pub notification: NotificationTable,
    pub content: ContentTable,
    pub special_events: RateMultipliers,
    /// DAU = installs × D7 × this bonus.
    pub dau_bonus: f64,
    pub base_session_minutes: f64,
    pub session_content: ContentSessionTable,
    pub session_engagement: LevelTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdFormatTable {
    pub rewarded: f64,
    pub interstitial: f64,
    pub banner: f64,
}

impl AdFormatTable {
    pub fn get(&self, f: AdFormat) -> f64 {
        match f {
            AdFormat::Rewarded => self.rewarded,
            AdFormat::Interstitial => self.interstitial,
            AdFormat::Banner => self.banner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IapTier {
    /// Fraction of DAU that purchases.
    pub conversion: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IapTable {
    pub low: IapTier,
    pub medium: IapTier,
    pub high: IapTier,
}

impl IapTable {
    pub fn get(&self, p: IapPricing) -> IapTier {
        match p {
            IapPricing::Low => self.low,
            IapPricing::Medium => self.medium,
            IapPricing::High => self.high,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonetizationBalance {
    pub base_ecpm: f64,
    pub fill_rate_band: Band,
    pub ad_format_ecpm: AdFormatTable,
    pub frequency_ecpm: LevelTable,
    pub impressions_per_user: LevelTable,
    pub iap: IapTable,
    pub promotion_boost: f64,
    /// Days of revenue a single install is credited with when estimating ROAS.
    pub roas_horizon_days: f64,
    pub roas_floor: f64,
}

/// Bounds on how far a genre bundle may move a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenreCaps {
    pub max_cpi_modifier: f64,
    pub min_retention_modifier: f64,
    pub min_revenue_modifier: f64,
    pub min_session_modifier: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarianceBalance {
    pub enabled: bool,
    /// Magnitude band; the sign is a fair coin.
    pub magnitude: Band,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventBalance {
    pub enabled: bool,
    pub positive_probability: f64,
    pub negative_probability: f64,
    pub max_per_session: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeight {
    pub triggered: f64,
    pub otherwise: f64,
}

impl CategoryWeight {
    pub fn pick(&self, triggered: bool) -> f64 {
        if triggered { self.triggered } else { self.otherwise }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackWeights {
    pub ctr_low: CategoryWeight,
    pub audience_broad: CategoryWeight,
    pub creative_performance: CategoryWeight,
    pub retention: CategoryWeight,
    pub monetization: CategoryWeight,
    pub positive: CategoryWeight,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackThresholds {
    pub ctr_low: f64,
    pub cpi_high: f64,
    pub cvr_low: f64,
    pub d7_low: f64,
    pub arpdau_low: f64,
    pub roas_good: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackBalance {
    pub min_messages: usize,
    pub max_messages: usize,
    /// Roll budget per selection; bounds the loop when categories collide.
    pub max_attempts: usize,
    pub thresholds: FeedbackThresholds,
    pub weights: FeedbackWeights,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsightThresholds {
    pub profitable_roas: f64,
    pub low_d7: f64,
    pub low_arpdau: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PreviewTargets {
    pub ctr: f64,
    pub cpi: f64,
    pub d1: f64,
    pub d7: f64,
    /// Target DAU as a fraction of installs.
    pub dau_ratio: f64,
    pub arpdau: f64,
    pub fill_rate: f64,
    pub roas: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    pub acquisition: AcquisitionBalance,
    pub retention: RetentionBalance,
    pub monetization: MonetizationBalance,
    pub genre_caps: GenreCaps,
    pub variance: VarianceBalance,
    pub events: EventBalance,
    pub feedback: FeedbackBalance,
    pub insights: InsightThresholds,
    pub preview: PreviewTargets,
    pub history_capacity: usize,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl BalanceConfig {
    /// Load a full balance table from a JSON file.
    /// In tests, use BalanceConfig::canonical().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {path}"))?;
        let config: BalanceConfig = serde_json::from_str(&content)
            .with_context(|| format!("Cannot parse balance table {path}"))?;
        config.validate()?;
        log::info!("Loaded balance table from {path}");
        Ok(config)
    }

    /// The built-in table: the forgiving tuning pass.
    pub fn canonical() -> Self {
        let age_cpi = BTreeMap::from([
            (AgeGroup::Age18To24, 0.85),
            (AgeGroup::Age25To34, 0.95),
            (AgeGroup::Age35To44, 1.10),
            (AgeGroup::Age45To54, 1.20),
            (AgeGroup::Age55To64, 1.30),
            (AgeGroup::Age65Plus, 1.40),
        ]);
        let interest_cpi = BTreeMap::from([
            (Interest::Gaming, 0.85),
            (Interest::Education, 1.10),
            (Interest::Lifestyle, 1.00),
        ]);

        Self {
            acquisition: AcquisitionBalance {
                base_cpi: 1.20,
                ctr_band: Band { min: 0.03, max: 0.09 },
                cvr_band: Band { min: 0.10, max: 0.15 },
                video_share_threshold: 0.6,
                video_ctr_bonus: 1.4,
                video_cvr_bonus: 1.3,
                ctr_floor: 0.02,
                age_cpi,
                interest_cpi,
                bidding: BiddingTable {
                    high:     BidEffect { cpi: 1.15, ctr: 1.10 },
                    moderate: BidEffect { cpi: 1.00, ctr: 1.00 },
                    low:      BidEffect { cpi: 0.90, ctr: 0.90 },
                },
                budget_min: 500.0,
                budget_max: 2000.0,
                budget_step: 100.0,
            },
            retention: RetentionBalance {
                base_rates: RateMultipliers { d1: 35.0, d7: 22.0, d30: 15.0 },
                floor: 8.0,
                ceiling: 100.0,
                notification: NotificationTable {
                    none:       RateMultipliers::IDENTITY,
                    occasional: RateMultipliers { d1: 1.15, d7: 1.12, d30: 1.10 },
                    frequent:   RateMultipliers { d1: 1.30, d7: 1.25, d30: 1.20 },
                },
                content: ContentTable {
                    rare:     RateMultipliers::IDENTITY,
                    regular:  RateMultipliers { d1: 1.0, d7: 1.15, d30: 1.20 },
                    frequent: RateMultipliers { d1: 1.0, d7: 1.30, d30: 1.35 },
                },
                special_events: RateMultipliers { d1: 1.0, d7: 1.25, d30: 1.30 },
                dau_bonus: 1.2,
                base_session_minutes: 15.0,
                session_content: ContentSessionTable { rare: 0.7, regular: 1.0, frequent: 1.3 },
                session_engagement: LevelTable { low: 0.9, medium: 1.1, high: 1.3 },
            },
            monetization: MonetizationBalance {
                base_ecpm: 14.0,
                fill_rate_band: Band { min: 0.85, max: 1.00 },
                ad_format_ecpm: AdFormatTable { rewarded: 1.3, interstitial: 1.2, banner: 0.8 },
                frequency_ecpm: LevelTable { low: 0.7, medium: 1.0, high: 1.2 },
                impressions_per_user: LevelTable { low: 3.0, medium: 6.0, high: 10.0 },
                iap: IapTable {
                    low:    IapTier { conversion: 0.18, price: 1.99 },
                    medium: IapTier { conversion: 0.12, price: 4.99 },
                    high:   IapTier { conversion: 0.07, price: 9.99 },
                },
                promotion_boost: 1.35,
                roas_horizon_days: 30.0,
                roas_floor: 0.5,
            },
            genre_caps: GenreCaps {
                max_cpi_modifier: 1.2,
                min_retention_modifier: 0.8,
                min_revenue_modifier: 0.8,
                min_session_modifier: 0.8,
            },
            variance: VarianceBalance {
                enabled: true,
                magnitude: Band { min: 0.05, max: 0.15 },
            },
            events: EventBalance {
                enabled: true,
                positive_probability: 0.4,
                negative_probability: 0.2,
                max_per_session: 3,
            },
            feedback: FeedbackBalance {
                min_messages: 2,
                max_messages: 3,
                max_attempts: 24,
                thresholds: FeedbackThresholds {
                    ctr_low: 0.02,
                    cpi_high: 1.20,
                    cvr_low: 0.08,
                    d7_low: 22.0,
                    arpdau_low: 0.5,
                    roas_good: 0.7,
                },
                weights: FeedbackWeights {
                    ctr_low:              CategoryWeight { triggered: 0.4, otherwise: 0.1 },
                    audience_broad:       CategoryWeight { triggered: 0.3, otherwise: 0.1 },
                    creative_performance: CategoryWeight { triggered: 0.3, otherwise: 0.1 },
                    retention:            CategoryWeight { triggered: 0.4, otherwise: 0.1 },
                    monetization:         CategoryWeight { triggered: 0.4, otherwise: 0.1 },
                    positive:             CategoryWeight { triggered: 0.5, otherwise: 0.2 },
                },
            },
            insights: InsightThresholds {
                profitable_roas: 1.0,
                low_d7: 20.0,
                low_arpdau: 0.10,
            },
            preview: PreviewTargets {
                ctr: 0.05,
                cpi: 1.50,
                d1: 30.0,
                d7: 18.0,
                dau_ratio: 0.18,
                arpdau: 0.85,
                fill_rate: 0.90,
                roas: 0.75,
            },
            history_capacity: 5,
        }
    }

    /// Same table with every stochastic layer switched off, so a run is a
    /// pure function of the formula draws.
    pub fn without_perturbation(mut self) -> Self {
        self.variance.enabled = false;
        self.events.enabled = false;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let a = &self.acquisition;
        ensure!(a.base_cpi > 0.0, "acquisition.base_cpi must be > 0");
        check_band("acquisition.ctr_band", a.ctr_band)?;
        check_band("acquisition.cvr_band", a.cvr_band)?;
        ensure!(a.ctr_floor > 0.0, "acquisition.ctr_floor must be > 0");
        ensure!(
            a.age_cpi.values().chain(a.interest_cpi.values()).all(|m| *m > 0.0),
            "age and interest CPI multipliers must be > 0"
        );
        ensure!(
            a.budget_step > 0.0 && a.budget_min > 0.0 && a.budget_min <= a.budget_max,
            "budget range must be positive and ordered"
        );

        let r = &self.retention;
        ensure!(
            r.floor > 0.0 && r.floor <= r.ceiling && r.ceiling <= 100.0,
            "retention floor/ceiling must satisfy 0 < floor <= ceiling <= 100"
        );

        let m = &self.monetization;
        ensure!(m.base_ecpm > 0.0, "monetization.base_ecpm must be > 0");
        check_band("monetization.fill_rate_band", m.fill_rate_band)?;
        ensure!(m.fill_rate_band.max <= 1.0, "fill rate cannot exceed 1.0");
        ensure!(m.roas_floor >= 0.0, "monetization.roas_floor must be >= 0");

        check_band("variance.magnitude", self.variance.magnitude)?;
        ensure!(self.variance.magnitude.max < 1.0, "variance magnitude must stay below 100%");

        for (name, p) in [
            ("events.positive_probability", self.events.positive_probability),
            ("events.negative_probability", self.events.negative_probability),
        ] {
            ensure!((0.0..=1.0).contains(&p), "{name} must be within [0,1]; got {p}");
        }

        let f = &self.feedback;
        ensure!(
            f.min_messages > 0 && f.min_messages <= f.max_messages,
            "feedback message counts must satisfy 0 < min <= max"
        );
        ensure!(f.max_attempts >= f.max_messages, "feedback.max_attempts too small");

        ensure!(self.history_capacity > 0, "history_capacity must be > 0");
        Ok(())
    }
}

fn check_band(name: &str, band: Band) -> anyhow::Result<()> {
    ensure!(
        band.min.is_finite() && band.max.is_finite() && band.min <= band.max,
        "{name}: min {} must not exceed max {}",
        band.min,
        band.max
    );
    Ok(())
}
