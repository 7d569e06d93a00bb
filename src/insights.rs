//! Derived daily insights: best hour, idlest hour and an advisory tier.

use serde::{Deserialize, Serialize};

use crate::clock::hour_label;
use crate::ledger::HourBucket;

/// Most insights ever returned.
pub const MAX_INSIGHTS: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationTier {
    Low,
    Moderate,
    High,
}

impl RecommendationTier {
    /// Tier for a working/(working+idle) ratio in `[0, 1]`.
    pub fn from_ratio(ratio: f64) -> Self {
        if !(ratio >= 0.3) {
            RecommendationTier::Low
        } else if ratio < 0.6 {
            RecommendationTier::Moderate
        } else {
            RecommendationTier::High
        }
    }

    /// One-line status shown next to the tier.
    pub fn headline(&self) -> &'static str {
        match self {
            RecommendationTier::Low => "Focus needed - Consider scheduling breaks strategically",
            RecommendationTier::Moderate => "Moderate productivity - Room for improvement",
            RecommendationTier::High => "Excellent productivity - Keep up the good work!",
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            RecommendationTier::Low => {
                "Low productivity detected. Try the Pomodoro technique: 25 minutes work, 5 minutes break."
            }
            RecommendationTier::Moderate => "Consider eliminating distractions during peak hours.",
            RecommendationTier::High => "Maintain current routine for optimal performance.",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub peak_hour: Option<u8>,
    pub peak_score: f64,
    pub idle_hour: Option<u8>,
    pub recommendation_tier: RecommendationTier,
    pub recommendation: String,
    /// Ordered textual insights, at most [`MAX_INSIGHTS`].
    pub messages: Vec<String>,
}

/// Derive insights from the hour buckets and the session totals.
///
/// Peak hour is the first hour (ascending) with the highest non-zero score;
/// idle hour is the first with the most idle time. With no presence time at
/// all the ratio counts as zero and lands in the "low" tier, never "high".
pub fn generate(hours: &[HourBucket], total_working: u64, total_idle: u64) -> Insights {
    let mut messages = Vec::with_capacity(MAX_INSIGHTS);

    let peak = first_max(hours, |bucket| bucket.productivity_score);
    if let Some(bucket) = peak {
        messages.push(format!(
            "Peak productivity at {} ({:.1}%)",
            hour_label(bucket.hour),
            bucket.productivity_score
        ));
    }

    let idle = first_max(hours, |bucket| bucket.idle_time as f64);
    if let Some(bucket) = idle {
        messages.push(format!("Most idle time at {}", hour_label(bucket.hour)));
    }

    let present = total_working + total_idle;
    let ratio = if present == 0 {
        0.0
    } else {
        total_working as f64 / present as f64
    };
    let tier = RecommendationTier::from_ratio(ratio);
    messages.push(tier.advice().to_string());
    messages.truncate(MAX_INSIGHTS);

    Insights {
        peak_hour: peak.map(|b| b.hour),
        peak_score: peak.map_or(0.0, |b| b.productivity_score),
        idle_hour: idle.map(|b| b.hour),
        recommendation_tier: tier,
        recommendation: tier.headline().to_string(),
        messages,
    }
}

/// First bucket in ascending hour order whose key is positive and maximal.
fn first_max<F>(hours: &[HourBucket], key: F) -> Option<&HourBucket>
where
    F: Fn(&HourBucket) -> f64,
{
    let mut ordered: Vec<&HourBucket> = hours.iter().collect();
    ordered.sort_by_key(|bucket| bucket.hour);

    let mut best: Option<(&HourBucket, f64)> = None;
    for bucket in ordered {
        let value = key(bucket);
        if value > 0.0 && best.map_or(true, |(_, best_value)| value > best_value) {
            best = Some((bucket, value));
        }
    }
    best.map(|(bucket, _)| bucket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Timestamp;
    use crate::status::Status;

    fn hours() -> Vec<HourBucket> {
        (0..24).map(HourBucket::new).collect()
    }

    #[test]
    fn empty_day_is_low_with_single_message() {
        let insights = generate(&hours(), 0, 0);
        assert_eq!(insights.peak_hour, None);
        assert_eq!(insights.idle_hour, None);
        assert_eq!(insights.recommendation_tier, RecommendationTier::Low);
        assert_eq!(insights.messages.len(), 1);
    }

    #[test]
    fn peak_and_idle_hours_prefer_earliest_tie() {
        let mut buckets = hours();
        buckets[9].record(Status::Working, 3_000, Timestamp(0));
        buckets[9].record(Status::Idle, 1_000, Timestamp(1));
        buckets[14].record(Status::Working, 6_000, Timestamp(2));
        buckets[14].record(Status::Idle, 2_000, Timestamp(3));
        buckets[16].record(Status::Idle, 2_000, Timestamp(4));

        let insights = generate(&buckets, 5_000, 5_000);
        assert_eq!(insights.peak_hour, Some(9));
        assert_eq!(insights.peak_score, 75.0);
        assert_eq!(insights.idle_hour, Some(14));
        assert_eq!(
            insights.messages,
            vec![
                "Peak productivity at 9 AM (75.0%)".to_string(),
                "Most idle time at 2 PM".to_string(),
                "Consider eliminating distractions during peak hours.".to_string(),
            ]
        );
    }

    #[test]
    fn tiers_follow_ratio_bands() {
        assert_eq!(RecommendationTier::from_ratio(0.0), RecommendationTier::Low);
        assert_eq!(RecommendationTier::from_ratio(0.29), RecommendationTier::Low);
        assert_eq!(RecommendationTier::from_ratio(0.3), RecommendationTier::Moderate);
        assert_eq!(RecommendationTier::from_ratio(0.59), RecommendationTier::Moderate);
        assert_eq!(RecommendationTier::from_ratio(0.6), RecommendationTier::High);
        assert_eq!(RecommendationTier::from_ratio(f64::NAN), RecommendationTier::Low);
    }

    #[test]
    fn high_tier_text() {
        let insights = generate(&hours(), 8_000, 2_000);
        assert_eq!(insights.recommendation_tier, RecommendationTier::High);
        assert_eq!(
            insights.recommendation,
            "Excellent productivity - Keep up the good work!"
        );
    }
}
