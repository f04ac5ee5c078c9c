use crate::Database;
use crate::models::{NotificationRow, fmt_ts};
use anyhow::Result;
use coterie_types::models::Notification;
use uuid::Uuid;

impl Database {
    /// Fan-out writer: all rows for one domain event land in one transaction.
    pub fn insert_notifications(&self, notifications: &[Notification]) -> Result<()> {
        if notifications.is_empty() {
            return Ok(());
        }
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO notifications (id, user_id, kind, title, body,
                                                entity_type, entity_id, is_read, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;
                for notification in notifications {
                    stmt.execute(rusqlite::params![
                        notification.id.to_string(),
                        notification.user_id.to_string(),
                        notification.kind.as_str(),
                        notification.title,
                        notification.body,
                        notification.entity_type,
                        notification.entity_id.map(|id| id.to_string()),
                        notification.is_read,
                        fmt_ts(notification.created_at),
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let sql = if unread_only {
                "SELECT id, user_id, kind, title, body, entity_type, entity_id, is_read, created_at
                 FROM notifications WHERE user_id = ?1 AND is_read = 0
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
            } else {
                "SELECT id, user_id, kind, title, body, entity_type, entity_id, is_read, created_at
                 FROM notifications WHERE user_id = ?1
                 ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
            };
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt
                .query_map(
                    rusqlite::params![user_id.to_string(), limit, skip],
                    map_notification,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(NotificationRow::into_notification)
                .collect()
        })
    }

    /// Scoped to the owner; marking twice stays true. False means the id is
    /// unknown or belongs to someone else.
    pub fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                (id.to_string(), user_id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
                [user_id.to_string()],
            )?;
            Ok(changed as u64)
        })
    }
}

fn map_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        body: row.get(4)?,
        entity_type: row.get(5)?,
        entity_id: row.get(6)?,
        is_read: row.get(7)?,
        created_at: row.get(8)?,
    })
}
