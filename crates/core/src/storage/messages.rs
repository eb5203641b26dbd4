//! Support message storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use super::parse::parse_datetime;
use crate::error::Result;
use crate::models::SupportMessage;

pub struct SupportStore<'a> {
    conn: &'a Connection,
}

impl<'a> SupportStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append a message; the id comes from the AUTOINCREMENT sequence
    pub fn append(&self, sender_email: &str, text: &str, is_admin_reply: bool) -> Result<SupportMessage> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO support_messages (sender_email, body, created_at, is_admin_reply)
             VALUES (?1, ?2, ?3, ?4)",
            params![sender_email, text, created_at.to_rfc3339(), is_admin_reply as i32],
        )?;

        Ok(SupportMessage {
            id: self.conn.last_insert_rowid(),
            sender_email: sender_email.to_string(),
            text: text.to_string(),
            created_at,
            is_admin_reply,
        })
    }

    /// Insert a message with a known id (snapshot restore only)
    pub(crate) fn insert_existing(&self, message: &SupportMessage) -> Result<()> {
        self.conn.execute(
            "INSERT INTO support_messages (id, sender_email, body, created_at, is_admin_reply)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                message.sender_email,
                message.text,
                message.created_at.to_rfc3339(),
                message.is_admin_reply as i32,
            ],
        )?;
        Ok(())
    }

    /// Messages in one user's thread, oldest first
    pub fn list_for(&self, email: &str) -> Result<Vec<SupportMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sender_email, body, created_at, is_admin_reply
             FROM support_messages WHERE sender_email = ?1 ORDER BY id ASC",
        )?;

        let messages = stmt
            .query_map(params![email], map_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    /// Entire log, oldest first
    pub fn list_all(&self) -> Result<Vec<SupportMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sender_email, body, created_at, is_admin_reply
             FROM support_messages ORDER BY id ASC",
        )?;

        let messages = stmt
            .query_map([], map_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    pub(crate) fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM support_messages", [])?;
        Ok(())
    }
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<SupportMessage> {
    Ok(SupportMessage {
        id: row.get(0)?,
        sender_email: row.get(1)?,
        text: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?)?,
        is_admin_reply: row.get::<_, i32>(4)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    #[test]
    fn ids_increase_in_append_order() {
        let db = Database::open_in_memory().unwrap();
        let store = db.support();

        let a = store.append("ana@example.com", "first", false).unwrap();
        let b = store.append("bob@example.com", "second", false).unwrap();
        let c = store.append("ana@example.com", "reply", true).unwrap();

        assert!(a.id < b.id && b.id < c.id);
    }

    #[test]
    fn list_for_filters_by_thread() {
        let db = Database::open_in_memory().unwrap();
        let store = db.support();
        store.append("ana@example.com", "hello", false).unwrap();
        store.append("bob@example.com", "other", false).unwrap();
        store.append("ana@example.com", "hi back", true).unwrap();

        let thread = store.list_for("ana@example.com").unwrap();
        let texts: Vec<_> = thread.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["hello", "hi back"]);
        assert_eq!(store.list_all().unwrap().len(), 3);
    }
}
