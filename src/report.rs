//! Wellness report
//!
//! Turns per-day activity into the daily series and summary a user sees,
//! with learning resources picked from the averages.

use crate::db::{DailyActivity, DateRange};
use crate::learning::LearningCatalog;
use chrono::NaiveDate;
use serde::Serialize;

/// Average stress at or above this suggests a stress resource
const HIGH_STRESS: f64 = 7.0;
/// Average mood at or below this suggests a mindfulness resource
const LOW_MOOD: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub stress_level: Option<f64>,
    pub mood_score: Option<f64>,
    pub interaction_count: i64,
    pub mood_entries: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub resource_id: String,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub average_stress: Option<f64>,
    pub average_mood: Option<f64>,
    pub total_interactions: i64,
    pub mood_entries: i64,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserReport {
    pub user_id: String,
    pub range: DateRange,
    pub metrics: Vec<DailyMetrics>,
    pub summary: ReportSummary,
}

/// Build a report from the days that saw activity.
///
/// Averages are weighted by check-ins, not by days. Interactions count the
/// user's chat messages plus those reported with check-ins.
pub fn build_report(
    user_id: &str,
    range: DateRange,
    days: &[DailyActivity],
    catalog: &LearningCatalog,
) -> UserReport {
    let metrics: Vec<DailyMetrics> = days
        .iter()
        .map(|day| DailyMetrics {
            date: day.date,
            stress_level: day.average_stress,
            mood_score: day.average_mood,
            interaction_count: day.chat_messages + day.reported_interactions,
            mood_entries: day.mood_entries,
        })
        .collect();

    let average_stress = weighted_average(days, |d| d.average_stress);
    let average_mood = weighted_average(days, |d| d.average_mood);
    let mood_entries: i64 = days.iter().map(|d| d.mood_entries).sum();
    let negative_moods: i64 = days.iter().map(|d| d.negative_moods).sum();

    let mut recommendations = Vec::new();
    if average_stress.is_some_and(|s| s >= HIGH_STRESS) {
        recommend(
            &mut recommendations,
            catalog,
            "Stress",
            "Your stress has been running high.",
        );
    }
    if average_mood.is_some_and(|m| m <= LOW_MOOD) || negative_moods * 2 > mood_entries {
        recommend(
            &mut recommendations,
            catalog,
            "Mindfulness",
            "Your mood has been low lately.",
        );
    }
    if recommendations.is_empty() {
        recommend(
            &mut recommendations,
            catalog,
            "Resilience",
            "Keep building on what is working for you.",
        );
    }

    UserReport {
        user_id: user_id.to_string(),
        range,
        summary: ReportSummary {
            average_stress,
            average_mood,
            total_interactions: metrics.iter().map(|m| m.interaction_count).sum(),
            mood_entries,
            recommendations,
        },
        metrics,
    }
}

#[allow(clippy::cast_precision_loss)] // Check-in counts stay far below 2^52
fn weighted_average(
    days: &[DailyActivity],
    value: impl Fn(&DailyActivity) -> Option<f64>,
) -> Option<f64> {
    let (sum, count) = days
        .iter()
        .filter_map(|d| value(d).map(|v| (v * d.metric_count as f64, d.metric_count)))
        .fold((0.0, 0_i64), |(sum, count), (v, n)| (sum + v, count + n));
    (count > 0).then(|| sum / count as f64)
}

fn recommend(
    out: &mut Vec<Recommendation>,
    catalog: &LearningCatalog,
    category: &str,
    reason: &str,
) {
    if let Some(resource) = catalog.by_category(category).first() {
        out.push(Recommendation {
            resource_id: resource.id.clone(),
            title: resource.title.clone(),
            reason: reason.to_string(),
        });
    }
}
