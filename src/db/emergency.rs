//! Emergency report storage

use super::{
    parse_column, parse_datetime, timestamp, Database, DbError, DbResult, EmergencyKind,
    EmergencyReport,
};
use chrono::Utc;
use rusqlite::params;

const INITIAL_STATUS: &str = "pending";

impl Database {
    pub fn report_emergency(
        &self,
        user_id: &str,
        kind: EmergencyKind,
        details: &str,
    ) -> DbResult<EmergencyReport> {
        let conn = self.conn()?;
        let now = Utc::now();
        let id = uuid::Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO emergency_reports (id, user_id, kind, details, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, user_id, kind.as_str(), details, INITIAL_STATUS, timestamp(now)],
        )?;

        tracing::warn!(user_id = %user_id, kind = %kind, report_id = %id, "Emergency reported");

        Ok(EmergencyReport {
            id,
            user_id: user_id.to_string(),
            kind,
            details: details.to_string(),
            status: INITIAL_STATUS.to_string(),
            created_at: now,
        })
    }

    pub fn list_emergency_reports(&self, user_id: &str) -> DbResult<Vec<EmergencyReport>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, kind, details, status, created_at
             FROM emergency_reports WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(EmergencyReport {
                id: row.get(0)?,
                user_id: row.get(1)?,
                kind: parse_column(2, &row.get::<_, String>(2)?)?,
                details: row.get(3)?,
                status: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_and_list() {
        let db = Database::open_in_memory().unwrap();
        let report = db
            .report_emergency("u-1", EmergencyKind::Medical, "Partner collapsed at scene")
            .unwrap();
        assert_eq!(report.status, "pending");

        db.report_emergency("u-1", EmergencyKind::Mental, "Need to talk to someone")
            .unwrap();

        let reports = db.list_emergency_reports("u-1").unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].kind, EmergencyKind::Mental);
        assert_eq!(reports[1].id, report.id);
        assert!(db.list_emergency_reports("u-2").unwrap().is_empty());
    }
}
