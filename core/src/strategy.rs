//! Player strategy inputs for the three campaign phases.
//!
//! These are the discrete choices the player makes. Everything here is
//! free-form until the owning phase commits its results; the `complete()`
//! helpers return `None` while any required field is still unset.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Creative formats a campaign may run at once.
pub const MAX_CREATIVE_FORMATS: usize = 2;

// ── Acquisition ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "18-24")]
    Age18To24,
    #[serde(rename = "25-34")]
    Age25To34,
    #[serde(rename = "35-44")]
    Age35To44,
    #[serde(rename = "45-54")]
    Age45To54,
    #[serde(rename = "55-64")]
    Age55To64,
    #[serde(rename = "65-84+")]
    Age65Plus,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 6] = [
        Self::Age18To24,
        Self::Age25To34,
        Self::Age35To44,
        Self::Age45To54,
        Self::Age55To64,
        Self::Age65Plus,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Age18To24 => "18-24",
            Self::Age25To34 => "25-34",
            Self::Age35To44 => "35-44",
            Self::Age45To54 => "45-54",
            Self::Age55To64 => "55-64",
            Self::Age65Plus => "65-84+",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interest {
    Gaming,
    Education,
    Lifestyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CreativeFormat {
    #[serde(rename = "Gameplay Videos")]
    GameplayVideos,
    #[serde(rename = "Playable Ads")]
    PlayableAds,
    #[serde(rename = "Educational Videos")]
    EducationalVideos,
    #[serde(rename = "Static Banner Ads")]
    StaticBannerAds,
    #[serde(rename = "Rewarded Videos")]
    RewardedVideos,
}

impl CreativeFormat {
    pub const CATALOG: [CreativeFormat; 5] = [
        Self::GameplayVideos,
        Self::PlayableAds,
        Self::EducationalVideos,
        Self::StaticBannerAds,
        Self::RewardedVideos,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::GameplayVideos => "Gameplay Videos",
            Self::PlayableAds => "Playable Ads",
            Self::EducationalVideos => "Educational Videos",
            Self::StaticBannerAds => "Static Banner Ads",
            Self::RewardedVideos => "Rewarded Videos",
        }
    }

    /// Motion formats count toward the video share; playables are
    /// rendered as interactive video.
    pub fn is_video(&self) -> bool {
        !matches!(self, Self::StaticBannerAds)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiddingStrategy {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudienceTargeting {
    pub age_group: Option<AgeGroup>,
    /// Inclusive (min, max) ages when the player uses a range slider
    /// instead of a bracket.
    pub age_range: Option<(u8, u8)>,
    pub interests: BTreeSet<Interest>,
    pub geo: Option<String>,
    pub device_type: Option<String>,
}

/// Partial update merged into `AudienceTargeting`; `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudiencePatch {
    #[serde(default)]
    pub age_group: Option<AgeGroup>,
    #[serde(default)]
    pub age_range: Option<(u8, u8)>,
    #[serde(default)]
    pub interests: Option<BTreeSet<Interest>>,
    #[serde(default)]
    pub geo: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
}

impl AudienceTargeting {
    pub fn merge(&mut self, patch: AudiencePatch) {
        if let Some(a) = patch.age_group {
            self.age_group = Some(a);
        }
        if let Some(r) = patch.age_range {
            self.age_range = Some(r);
        }
        if let Some(i) = patch.interests {
            self.interests = i;
        }
        if let Some(g) = patch.geo {
            self.geo = Some(g);
        }
        if let Some(d) = patch.device_type {
            self.device_type = Some(d);
        }
    }

    pub fn toggle_interest(&mut self, interest: Interest) {
        if !self.interests.remove(&interest) {
            self.interests.insert(interest);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreativeSelection {
    /// Ordered, distinct, at most `MAX_CREATIVE_FORMATS`.
    pub formats: Vec<CreativeFormat>,
}

impl CreativeSelection {
    /// Replace the selection, keeping the first occurrence of each format
    /// and dropping anything past the cap.
    pub fn set_formats(&mut self, formats: Vec<CreativeFormat>) {
        let mut kept = Vec::with_capacity(MAX_CREATIVE_FORMATS);
        for f in formats {
            if kept.len() == MAX_CREATIVE_FORMATS {
                break;
            }
            if !kept.contains(&f) {
                kept.push(f);
            }
        }
        self.formats = kept;
    }

    /// Deselect if present, otherwise append when below the cap.
    /// Returns false when the toggle was refused because the selection is full.
    pub fn toggle(&mut self, format: CreativeFormat) -> bool {
        if let Some(pos) = self.formats.iter().position(|f| *f == format) {
            self.formats.remove(pos);
            return true;
        }
        if self.formats.len() >= MAX_CREATIVE_FORMATS {
            return false;
        }
        self.formats.push(format);
        true
    }

    /// Fraction of selected formats that are video. Empty selection → 0.
    pub fn video_share(&self) -> f64 {
        video_share(&self.formats)
    }
}

pub fn video_share(formats: &[CreativeFormat]) -> f64 {
    if formats.is_empty() {
        return 0.0;
    }
    let videos = formats.iter().filter(|f| f.is_video()).count();
    videos as f64 / formats.len() as f64
}

// ── Retention ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFrequency {
    None,
    Occasional,
    Frequent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentUpdates {
    Rare,
    Regular,
    Frequent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementSpend {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionStrategy {
    pub notification_frequency: Option<NotificationFrequency>,
    pub content_updates: Option<ContentUpdates>,
    /// `None` until the player explicitly enables or disables events.
    pub special_events: Option<bool>,
    pub engagement_spend: Option<EngagementSpend>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetentionPatch {
    #[serde(default)]
    pub notification_frequency: Option<NotificationFrequency>,
    #[serde(default)]
    pub content_updates: Option<ContentUpdates>,
    #[serde(default)]
    pub special_events: Option<bool>,
    #[serde(default)]
    pub engagement_spend: Option<EngagementSpend>,
}

/// A fully populated retention strategy, ready for the formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetentionChoices {
    pub notification_frequency: NotificationFrequency,
    pub content_updates: ContentUpdates,
    pub special_events: bool,
    pub engagement_spend: EngagementSpend,
}

impl RetentionStrategy {
    pub fn merge(&mut self, patch: RetentionPatch) {
        if patch.notification_frequency.is_some() {
            self.notification_frequency = patch.notification_frequency;
        }
        if patch.content_updates.is_some() {
            self.content_updates = patch.content_updates;
        }
        if patch.special_events.is_some() {
            self.special_events = patch.special_events;
        }
        if patch.engagement_spend.is_some() {
            self.engagement_spend = patch.engagement_spend;
        }
    }

    pub fn complete(&self) -> Option<RetentionChoices> {
        Some(RetentionChoices {
            notification_frequency: self.notification_frequency?,
            content_updates: self.content_updates?,
            special_events: self.special_events?,
            engagement_spend: self.engagement_spend?,
        })
    }

    /// Names of the fields still unset, in display order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.notification_frequency.is_none() {
            missing.push("notification_frequency");
        }
        if self.content_updates.is_none() {
            missing.push("content_updates");
        }
        if self.special_events.is_none() {
            missing.push("special_events");
        }
        if self.engagement_spend.is_none() {
            missing.push("engagement_spend");
        }
        missing
    }
}

// ── Monetization ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdFormat {
    Rewarded,
    Interstitial,
    Banner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdFrequency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IapPricing {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionalOffers {
    None,
    Limited,
    Frequent,
}

impl PromotionalOffers {
    pub fn enabled(&self) -> bool {
        !matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonetizationStrategy {
    pub ad_formats: BTreeSet<AdFormat>,
    pub ad_frequency: Option<AdFrequency>,
    pub iap_pricing: Option<IapPricing>,
    pub promotional_offers: Option<PromotionalOffers>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonetizationPatch {
    #[serde(default)]
    pub ad_formats: Option<BTreeSet<AdFormat>>,
    #[serde(default)]
    pub ad_frequency: Option<AdFrequency>,
    #[serde(default)]
    pub iap_pricing: Option<IapPricing>,
    #[serde(default)]
    pub promotional_offers: Option<PromotionalOffers>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonetizationChoices {
    pub ad_formats: BTreeSet<AdFormat>,
    pub ad_frequency: AdFrequency,
    pub iap_pricing: IapPricing,
    pub promotional_offers: PromotionalOffers,
}

impl MonetizationStrategy {
    pub fn merge(&mut self, patch: MonetizationPatch) {
        if let Some(formats) = patch.ad_formats {
            self.ad_formats = formats;
        }
        if patch.ad_frequency.is_some() {
            self.ad_frequency = patch.ad_frequency;
        }
        if patch.iap_pricing.is_some() {
            self.iap_pricing = patch.iap_pricing;
        }
        if patch.promotional_offers.is_some() {
            self.promotional_offers = patch.promotional_offers;
        }
    }

    pub fn toggle_ad_format(&mut self, format: AdFormat) {
        if !self.ad_formats.remove(&format) {
            self.ad_formats.insert(format);
        }
    }

    pub fn complete(&self) -> Option<MonetizationChoices> {
        if self.ad_formats.is_empty() {
            return None;
        }
        Some(MonetizationChoices {
            ad_formats: self.ad_formats.clone(),
            ad_frequency: self.ad_frequency?,
            iap_pricing: self.iap_pricing?,
            promotional_offers: self.promotional_offers?,
        })
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.ad_formats.is_empty() {
            missing.push("ad_formats");
        }
        if self.ad_frequency.is_none() {
            missing.push("ad_frequency");
        }
        if self.iap_pricing.is_none() {
            missing.push("iap_pricing");
        }
        if self.promotional_offers.is_none() {
            missing.push("promotional_offers");
        }
        missing
    }
}
