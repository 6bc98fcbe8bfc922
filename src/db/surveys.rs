//! Survey response storage

use super::{parse_datetime, timestamp, Database, DbError, DbResult, SurveyResponse, SurveyStats};
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

impl Database {
    pub fn save_survey_response(
        &self,
        user_id: &str,
        category: &str,
        question: &str,
        answer: &str,
    ) -> DbResult<SurveyResponse> {
        let conn = self.conn()?;
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO survey_responses (id, user_id, category, question, answer, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, user_id, category, question, answer, timestamp(now)],
        )?;

        Ok(SurveyResponse {
            id,
            user_id: user_id.to_string(),
            category: category.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            created_at: now,
        })
    }

    /// Newest first, optionally restricted to one category
    pub fn list_survey_responses(
        &self,
        user_id: &str,
        category: Option<&str>,
    ) -> DbResult<Vec<SurveyResponse>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, category, question, answer, created_at
             FROM survey_responses
             WHERE user_id = ?1 AND (?2 IS NULL OR category = ?2)
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![user_id, category], |row| {
            Ok(SurveyResponse {
                id: row.get(0)?,
                user_id: row.get(1)?,
                category: row.get(2)?,
                question: row.get(3)?,
                answer: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn survey_stats(&self, user_id: &str) -> DbResult<SurveyStats> {
        let conn = self.conn()?;
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM survey_responses WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        let last: Option<String> = conn
            .query_row(
                "SELECT created_at FROM survey_responses WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC LIMIT 1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(SurveyStats {
            total,
            last_submission: last.as_deref().map(parse_datetime),
        })
    }
}
