//! Final campaign totals and insight strings.
//!
//! RULE: `aggregate` is a pure function of committed state. Calling it twice
//! on the same state yields identical `FinalResults`.

use crate::{
    config::InsightThresholds,
    state::{FinalResults, MonetizationResults, RetentionResults},
    types::{round2, safe_div, Dollars},
};

pub const UNPROFITABLE: &str = "Your campaign is currently unprofitable. Consider optimizing ad targeting and reducing acquisition costs.";
pub const PROFITABLE: &str = "Your campaign is profitable! Focus on scaling while maintaining efficiency.";
pub const LOW_RETENTION: &str = "Low retention rates are affecting your revenue. Consider improving user engagement strategies.";
pub const LOW_ARPDAU: &str = "Your ARPDAU is below industry average. Test different monetization strategies to improve revenue.";

pub fn aggregate(
    thresholds: &InsightThresholds,
    budget: Dollars,
    retention: &RetentionResults,
    monetization: &MonetizationResults,
) -> FinalResults {
    let total_spend = budget;
    let total_revenue = monetization.ad_revenue + monetization.iap_revenue;
    let roas = round2(safe_div(total_revenue, total_spend));

    let mut insights = Vec::new();
    if roas < thresholds.profitable_roas {
        insights.push(UNPROFITABLE.to_string());
    } else {
        insights.push(PROFITABLE.to_string());
    }
    if retention.retention_rates.d7 < thresholds.low_d7 {
        insights.push(LOW_RETENTION.to_string());
    }
    if monetization.arpdau < thresholds.low_arpdau {
        insights.push(LOW_ARPDAU.to_string());
    }

    FinalResults { total_spend, total_revenue, roas, insights }
}

/// Whether a final ROAS counts as profitable.
pub fn is_profitable(thresholds: &InsightThresholds, roas: f64) -> bool {
    roas >= thresholds.profitable_roas
}
