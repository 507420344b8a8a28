use anyhow::Result;
use tracing::debug;

use super::models::ChatRecord;
use super::DbPool;

pub struct Repository {
    pub pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Persist one user/assistant exchange.
    pub async fn insert_exchange(&self, record: &ChatRecord) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO chat_messages
                (user_id, thread_id, message, response, model, timestamp)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(record.user_id)
        .bind(&record.thread_id)
        .bind(&record.message)
        .bind(&record.response)
        .bind(&record.model)
        .bind(record.timestamp)
        .execute(self.pool.get_pool())
        .await?;

        Ok(())
    }

    /// Ordered transcript of one thread, scoped to its owner.
    pub async fn get_history(&self, user_id: i32, thread_id: &str) -> Result<Vec<ChatRecord>> {
        let records = sqlx::query_as::<_, ChatRecord>(
            r#"SELECT
                user_id,
                thread_id,
                message,
                response,
                model,
                timestamp
               FROM chat_messages
               WHERE user_id = $1 AND thread_id = $2
               ORDER BY timestamp ASC"#,
        )
        .bind(user_id)
        .bind(thread_id)
        .fetch_all(self.pool.get_pool())
        .await?;

        debug!(
            "Fetched {} records for user {} thread {}",
            records.len(),
            user_id,
            thread_id
        );

        Ok(records)
    }

    /// Distinct thread ids owned by the user, newest activity first.
    pub async fn list_threads(&self, user_id: i32) -> Result<Vec<String>> {
        let threads = sqlx::query_scalar::<_, String>(
            r#"SELECT thread_id
               FROM chat_messages
               WHERE user_id = $1
               GROUP BY thread_id
               ORDER BY MAX(timestamp) DESC"#,
        )
        .bind(user_id)
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(threads)
    }

    /// Delete all records of one thread. Returns number of rows removed.
    pub async fn delete_thread(&self, user_id: i32, thread_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM chat_messages WHERE user_id = $1 AND thread_id = $2",
        )
        .bind(user_id)
        .bind(thread_id)
        .execute(self.pool.get_pool())
        .await?;

        Ok(result.rows_affected())
    }
}
