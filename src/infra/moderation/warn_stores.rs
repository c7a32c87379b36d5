// SQLite-backed warn store so warning history survives restarts.

use crate::core::moderation::{ModerationError, WarnRecord, WarnStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteWarnStore {
    pool: Pool<Sqlite>,
}

impl SqliteWarnStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS warns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                guild_id INTEGER NOT NULL,
                moderator_id INTEGER NOT NULL,
                reason TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_warns_user_guild
                ON warns(user_id, guild_id, created_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl WarnStore for SqliteWarnStore {
    async fn add_warn(&self, record: WarnRecord) -> Result<u32, ModerationError> {
        sqlx::query(
            r#"
            INSERT INTO warns (user_id, guild_id, moderator_id, reason, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.user_id as i64)
        .bind(record.guild_id as i64)
        .bind(record.moderator_id as i64)
        .bind(&record.reason)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        let row = sqlx::query("SELECT COUNT(*) AS total FROM warns WHERE user_id = ? AND guild_id = ?")
            .bind(record.user_id as i64)
            .bind(record.guild_id as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        let total: i64 = row.get("total");
        Ok(total as u32)
    }

    async fn list_warns(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> Result<Vec<WarnRecord>, ModerationError> {
        let rows = sqlx::query(
            r#"
            SELECT moderator_id, reason, created_at
            FROM warns
            WHERE user_id = ? AND guild_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id as i64)
        .bind(guild_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ModerationError::StorageError(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let moderator_id: i64 = row.get("moderator_id");
            let reason: String = row.get("reason");
            let created_at_str: String = row.get("created_at");
            let created_at = DateTime::parse_from_rfc3339(&created_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());

            records.push(WarnRecord {
                user_id,
                guild_id,
                moderator_id: moderator_id as u64,
                reason,
                created_at,
            });
        }
        Ok(records)
    }

    async fn clear_warns(&self, user_id: u64, guild_id: u64) -> Result<u64, ModerationError> {
        let result = sqlx::query("DELETE FROM warns WHERE user_id = ? AND guild_id = ?")
            .bind(user_id as i64)
            .bind(guild_id as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| ModerationError::StorageError(e.to_string()))?;
        Ok(result.rows_affected())
    }
}
