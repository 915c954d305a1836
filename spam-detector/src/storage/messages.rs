//! Classification history

use sqlx::SqlitePool;
use tracing::debug;

use super::types::{
    MessageFilter, MessageStats, MessageType, MessagesByType, StoredMessage, UserRef,
};
use crate::error::Result;
use crate::spam::Prediction;

type MessageRow = (i64, String, String, bool, f64, String, i64, String, String);

fn message_from_row(
    (id, content, message_type, is_spam, confidence, created_at, user_id, name, email): MessageRow,
) -> StoredMessage {
    StoredMessage {
        id,
        content,
        message_type,
        is_spam,
        confidence,
        created_at,
        user: UserRef {
            id: user_id,
            name,
            email,
        },
    }
}

const MESSAGE_SELECT: &str = r#"
    SELECT m.id, m.content, m.type, m.is_spam, m.confidence, m.created_at,
           u.id, u.name, u.email
    FROM messages m
    JOIN users u ON m.user_id = u.id
"#;

/// Store of classified messages
#[derive(Clone)]
pub struct MessageStore {
    db: SqlitePool,
}

impl MessageStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create the messages table; the users table must exist first
    pub async fn init_db(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                content TEXT NOT NULL,
                type TEXT NOT NULL,
                is_spam INTEGER NOT NULL,
                confidence REAL NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Record one classification
    pub async fn record(
        &self,
        user_id: i64,
        content: &str,
        message_type: MessageType,
        prediction: &Prediction,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO messages (user_id, content, type, is_spam, confidence, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(content)
        .bind(message_type.as_str())
        .bind(prediction.is_spam)
        .bind(prediction.confidence)
        .bind(super::now_timestamp())
        .execute(&self.db)
        .await?;

        debug!("Recorded classification for user {}", user_id);
        Ok(result.last_insert_rowid())
    }

    /// Messages matching the filter, newest first
    pub async fn list(&self, filter: MessageFilter) -> Result<Vec<StoredMessage>> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR m.is_spam = ?1) AND (?2 IS NULL OR m.type = ?2) \
             ORDER BY m.created_at DESC, m.id DESC",
            MESSAGE_SELECT
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(filter.is_spam)
            .bind(filter.message_type.map(|t| t.as_str()))
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(message_from_row).collect())
    }

    /// Totals, per-channel counts and the five most recent messages
    pub async fn stats(&self) -> Result<MessageStats> {
        let (total, spam, ham, email, sms, social): (i64, i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN is_spam THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN is_spam THEN 0 ELSE 1 END), 0),
                    COALESCE(SUM(CASE WHEN type = 'email' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN type = 'sms' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN type = 'social' THEN 1 ELSE 0 END), 0)
                FROM messages
                "#,
            )
            .fetch_one(&self.db)
            .await?;

        let sql = format!("{} ORDER BY m.created_at DESC, m.id DESC LIMIT 5", MESSAGE_SELECT);
        let recent = sqlx::query_as::<_, MessageRow>(&sql)
            .fetch_all(&self.db)
            .await?
            .into_iter()
            .map(message_from_row)
            .collect();

        Ok(MessageStats {
            total,
            spam,
            ham,
            by_type: MessagesByType { email, sms, social },
            recent,
        })
    }
}
