//! Notification storage

use super::{parse_datetime, timestamp, Database, DbError, DbResult, Notification};
use chrono::Utc;
use rusqlite::{params, Connection};

/// Default page size for notification listings
pub const DEFAULT_NOTIFICATION_LIMIT: u32 = 20;

/// Insert using an already-held connection
pub(super) fn insert_notification(
    conn: &Connection,
    user_id: &str,
    title: &str,
    message: &str,
) -> DbResult<Notification> {
    let now = Utc::now();
    let id = uuid::Uuid::new_v4().to_string();

    conn.execute(
        "INSERT INTO notifications (id, user_id, title, message, read, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        params![id, user_id, title, message, timestamp(now)],
    )?;

    Ok(Notification {
        id,
        user_id: user_id.to_string(),
        title: title.to_string(),
        message: message.to_string(),
        read: false,
        created_at: now,
    })
}

impl Database {
    pub fn create_notification(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
    ) -> DbResult<Notification> {
        let conn = self.conn()?;
        insert_notification(&conn, user_id, title, message)
    }

    /// Newest first
    pub fn list_notifications(&self, user_id: &str, limit: u32) -> DbResult<Vec<Notification>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, message, read, created_at
             FROM notifications WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![user_id, limit], |row| {
            Ok(Notification {
                id: row.get(0)?,
                user_id: row.get(1)?,
                title: row.get(2)?,
                message: row.get(3)?,
                read: row.get(4)?,
                created_at: parse_datetime(&row.get::<_, String>(5)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    pub fn mark_notification_read(&self, id: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE notifications SET read = 1 WHERE id = ?1",
            params![id],
        )?;
        if updated == 0 {
            return Err(DbError::NotificationNotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn unread_notification_count(&self, user_id: &str) -> DbResult<i64> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_gets_welcome_notification() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("u-1", "Jo", None, None, None).unwrap();

        let list = db
            .list_notifications("u-1", DEFAULT_NOTIFICATION_LIMIT)
            .unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].title, "Welcome!");
        assert!(!list[0].read);
        assert_eq!(db.unread_notification_count("u-1").unwrap(), 1);
    }

    #[test]
    fn test_mark_read() {
        let db = Database::open_in_memory().unwrap();
        let n = db
            .create_notification("u-1", "Check-in", "How was your shift?")
            .unwrap();
        db.create_notification("u-1", "Reminder", "Log your mood")
            .unwrap();
        assert_eq!(db.unread_notification_count("u-1").unwrap(), 2);

        db.mark_notification_read(&n.id).unwrap();
        assert_eq!(db.unread_notification_count("u-1").unwrap(), 1);

        let list = db.list_notifications("u-1", 10).unwrap();
        let marked = list.iter().find(|x| x.id == n.id).unwrap();
        assert!(marked.read);
    }

    #[test]
    fn test_mark_unknown_notification_fails() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.mark_notification_read("missing"),
            Err(DbError::NotificationNotFound(_))
        ));
    }

    #[test]
    fn test_list_is_newest_first_and_limited() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..3 {
            db.create_notification("u-1", &format!("n{i}"), "body")
                .unwrap();
        }
        let list = db.list_notifications("u-1", 2).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].title, "n2");
    }
}
