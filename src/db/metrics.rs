//! Wellness check-ins and per-day activity

use super::{
    parse_datetime, timestamp, DailyActivity, Database, DbError, DbResult, WellnessMetric,
};
use chrono::{DateTime, Days, NaiveDate, Utc};
use rusqlite::{params, types::Type};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Accepted values for stress level and mood score
pub const METRIC_SCALE: RangeInclusive<u8> = 1..=10;

/// Days covered when no range is given
pub const DEFAULT_RANGE_DAYS: u64 = 30;

/// Inclusive range of UTC calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// `None` when `start` is after `end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The `days` days that end with `end`
    pub fn ending(end: NaiveDate, days: u64) -> Self {
        let start = end
            .checked_sub_days(Days::new(days.saturating_sub(1)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    /// Text bounds comparable with stored timestamps
    fn bounds(&self) -> (String, String) {
        (
            format!("{}T00:00:00.000000Z", self.start),
            format!("{}T23:59:59.999999Z", self.end),
        )
    }
}

impl Database {
    pub fn save_wellness_metric(
        &self,
        user_id: &str,
        stress_level: u8,
        mood_score: u8,
        interaction_count: u32,
        recorded_at: DateTime<Utc>,
    ) -> DbResult<WellnessMetric> {
        for (name, value) in [("stress_level", stress_level), ("mood_score", mood_score)] {
            if !METRIC_SCALE.contains(&value) {
                return Err(DbError::InvalidMetric(format!(
                    "{name} must be between {} and {}, got {value}",
                    METRIC_SCALE.start(),
                    METRIC_SCALE.end()
                )));
            }
        }

        let conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO wellness_metrics (id, user_id, stress_level, mood_score, interaction_count, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                user_id,
                stress_level,
                mood_score,
                interaction_count,
                timestamp(recorded_at)
            ],
        )?;

        Ok(WellnessMetric {
            id,
            user_id: user_id.to_string(),
            stress_level,
            mood_score,
            interaction_count,
            recorded_at,
        })
    }

    /// Check-ins inside the range, newest first
    pub fn list_wellness_metrics(
        &self,
        user_id: &str,
        range: &DateRange,
    ) -> DbResult<Vec<WellnessMetric>> {
        let conn = self.conn()?;
        let (lower, upper) = range.bounds();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, stress_level, mood_score, interaction_count, recorded_at
             FROM wellness_metrics
             WHERE user_id = ?1 AND recorded_at BETWEEN ?2 AND ?3
             ORDER BY recorded_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![user_id, lower, upper], |row| {
            Ok(WellnessMetric {
                id: row.get(0)?,
                user_id: row.get(1)?,
                stress_level: row.get(2)?,
                mood_score: row.get(3)?,
                interaction_count: row.get(4)?,
                recorded_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Check-ins, chat messages and mood entries grouped by day, oldest
    /// first. Days with no activity are left out.
    pub fn daily_activity(&self, user_id: &str, range: &DateRange) -> DbResult<Vec<DailyActivity>> {
        let conn = self.conn()?;
        let (lower, upper) = range.bounds();
        let mut days: BTreeMap<NaiveDate, DailyActivity> = BTreeMap::new();

        let mut metrics = conn.prepare(
            "SELECT substr(recorded_at, 1, 10), COUNT(*), AVG(stress_level), AVG(mood_score),
                    SUM(interaction_count)
             FROM wellness_metrics
             WHERE user_id = ?1 AND recorded_at BETWEEN ?2 AND ?3
             GROUP BY 1",
        )?;
        let rows = metrics.query_map(params![user_id, lower, upper], |row| {
            Ok((
                parse_day(row)?,
                row.get::<_, i64>(1)?,
                row.get::<_, Option<f64>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        for row in rows {
            let (date, count, stress, mood, interactions) = row?;
            let day = days
                .entry(date)
                .or_insert_with(|| DailyActivity::empty(date));
            day.metric_count = count;
            day.average_stress = stress;
            day.average_mood = mood;
            day.reported_interactions = interactions;
        }

        let mut chat = conn.prepare(
            "SELECT substr(created_at, 1, 10), COUNT(*)
             FROM chat_messages
             WHERE user_id = ?1 AND role = 'user' AND created_at BETWEEN ?2 AND ?3
             GROUP BY 1",
        )?;
        let rows = chat.query_map(params![user_id, lower, upper], |row| {
            Ok((parse_day(row)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (date, count) = row?;
            let day = days
                .entry(date)
                .or_insert_with(|| DailyActivity::empty(date));
            day.chat_messages = count;
        }

        let mut moods = conn.prepare(
            "SELECT substr(created_at, 1, 10), COUNT(*), SUM(mood_label = 'negative')
             FROM moods
             WHERE user_id = ?1 AND created_at BETWEEN ?2 AND ?3
             GROUP BY 1",
        )?;
        let rows = moods.query_map(params![user_id, lower, upper], |row| {
            Ok((parse_day(row)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
        })?;
        for row in rows {
            let (date, count, negative) = row?;
            let day = days
                .entry(date)
                .or_insert_with(|| DailyActivity::empty(date));
            day.mood_entries = count;
            day.negative_moods = negative;
        }

        Ok(days.into_values().collect())
    }
}

/// First column as a `YYYY-MM-DD` day
fn parse_day(row: &rusqlite::Row<'_>) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(0)?;
    raw.parse().map_err(|e: chrono::ParseError| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
    })
}
