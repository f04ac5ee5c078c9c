use crate::Database;
use crate::models::{ConversationRow, MessageRow, fmt_opt_ts, fmt_ts};
use crate::queries::OptionalExt;
use anyhow::Result;
use chrono::{DateTime, Utc};
use coterie_types::models::{Conversation, Message};
use rusqlite::Connection;
use uuid::Uuid;

impl Database {
    /// Returns the conversation for a user pair, creating it on first
    /// contact. The pair is stored in normalized order so either side opens
    /// the same row; the bool reports whether a row was created.
    pub fn open_conversation(
        &self,
        user: Uuid,
        peer: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(Conversation, bool)> {
        let (a, b) = if user <= peer { (user, peer) } else { (peer, user) };
        self.with_conn_mut(|conn| {
            if let Some(existing) = query_conversation_by_pair(conn, a, b)? {
                return Ok((existing, false));
            }

            let conversation = Conversation {
                id: Uuid::new_v4(),
                user_a: a,
                user_b: b,
                created_at: at,
                last_message_at: at,
            };
            conn.execute(
                "INSERT INTO conversations (id, user_a, user_b, created_at, last_message_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    conversation.id.to_string(),
                    conversation.user_a.to_string(),
                    conversation.user_b.to_string(),
                    fmt_ts(conversation.created_at),
                    fmt_ts(conversation.last_message_at),
                ],
            )?;
            Ok((conversation, true))
        })
    }

    pub fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, user_a, user_b, created_at, last_message_at
                     FROM conversations WHERE id = ?1",
                    [id.to_string()],
                    map_conversation,
                )
                .optional()?;
            row.map(ConversationRow::into_conversation).transpose()
        })
    }

    pub fn list_conversations_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_a, user_b, created_at, last_message_at
                 FROM conversations
                 WHERE user_a = ?1 OR user_b = ?1
                 ORDER BY last_message_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id.to_string()], map_conversation)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter()
                .map(ConversationRow::into_conversation)
                .collect()
        })
    }

    /// Appends the message and bumps the conversation's recency in one
    /// transaction.
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, body, is_read,
                                       read_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    message.id.to_string(),
                    message.conversation_id.to_string(),
                    message.sender_id.to_string(),
                    message.body,
                    message.is_read,
                    fmt_opt_ts(message.read_at),
                    fmt_ts(message.created_at),
                ],
            )?;
            tx.execute(
                "UPDATE conversations SET last_message_at = ?1 WHERE id = ?2",
                (fmt_ts(message.created_at), message.conversation_id.to_string()),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Newest first.
    pub fn list_messages(
        &self,
        conversation_id: Uuid,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, sender_id, body, is_read, read_at, created_at
                 FROM messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let rows = stmt
                .query_map(
                    rusqlite::params![conversation_id.to_string(), limit, skip],
                    map_message,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(MessageRow::into_message).collect()
        })
    }

    /// Marks everything the peer sent as read; returns how many were unread.
    pub fn mark_messages_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET is_read = 1, read_at = ?1
                 WHERE conversation_id = ?2 AND sender_id != ?3 AND is_read = 0",
                rusqlite::params![fmt_ts(at), conversation_id.to_string(), reader_id.to_string()],
            )?;
            Ok(changed as u64)
        })
    }
}

fn map_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        user_a: row.get(1)?,
        user_b: row.get(2)?,
        created_at: row.get(3)?,
        last_message_at: row.get(4)?,
    })
}

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        body: row.get(3)?,
        is_read: row.get(4)?,
        read_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_conversation_by_pair(
    conn: &Connection,
    user_a: Uuid,
    user_b: Uuid,
) -> Result<Option<Conversation>> {
    let row = conn
        .query_row(
            "SELECT id, user_a, user_b, created_at, last_message_at
             FROM conversations WHERE user_a = ?1 AND user_b = ?2",
            (user_a.to_string(), user_b.to_string()),
            map_conversation,
        )
        .optional()?;
    row.map(ConversationRow::into_conversation).transpose()
}
