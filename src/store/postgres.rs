use sqlx::PgPool;

use crate::models::mood::MoodRecord;
use crate::models::sleep::{NewSleep, SleepChanges, SleepFilter, SleepRecord};
use crate::store::{RecordStore, StoreResult};

/// sqlx-backed [`RecordStore`]. The pool is cheap to clone and safe to
/// share across concurrent operations.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecordStore for PgRecordStore {
    async fn insert_sleep(&self, fields: NewSleep) -> StoreResult<SleepRecord> {
        let sleep = sqlx::query_as::<_, SleepRecord>(
            r#"
            INSERT INTO sleep (sleep_start, sleep_end, sleep_goal, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(fields.sleep_start)
        .bind(fields.sleep_end)
        .bind(fields.sleep_goal)
        .bind(fields.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sleep)
    }

    async fn update_sleep(&self, id: i64, changes: SleepChanges) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sleep SET
                sleep_start = COALESCE($2, sleep_start),
                sleep_end = COALESCE($3, sleep_end),
                sleep_goal = COALESCE($4, sleep_goal)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.sleep_start)
        .bind(changes.sleep_end)
        .bind(changes.sleep_goal)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_sleep(&self, id: i64) -> StoreResult<u64> {
        // Mood rows go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM sleep WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_sleep_by(&self, filter: SleepFilter) -> StoreResult<Vec<SleepRecord>> {
        let sleeps = sqlx::query_as::<_, SleepRecord>(
            r#"
            SELECT * FROM sleep
            WHERE ($1::BIGINT IS NULL OR id = $1)
              AND ($2::BIGINT IS NULL OR user_id = $2)
              AND sleep_start BETWEEN $3 AND $4
            ORDER BY sleep_start ASC
            "#,
        )
        .bind(filter.id)
        .bind(filter.user_id)
        .bind(filter.start_after)
        .bind(filter.start_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(sleeps)
    }

    async fn insert_mood(&self, sleep_id: i64, order: i32, score: i32) -> StoreResult<MoodRecord> {
        // The UNIQUE (sleep_id, "order") index rejects a second record for
        // the same slot, so a lost reconciliation race surfaces as an error
        // instead of a duplicate.
        let mood = sqlx::query_as::<_, MoodRecord>(
            r#"
            INSERT INTO mood (sleep_id, "order", mood_score)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(sleep_id)
        .bind(order)
        .bind(score)
        .fetch_one(&self.pool)
        .await?;

        Ok(mood)
    }

    async fn update_mood(&self, id: i64, score: i32) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE mood SET mood_score = $2 WHERE id = $1")
            .bind(id)
            .bind(score)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn find_mood_by_sleep_id(&self, sleep_id: i64) -> StoreResult<Vec<MoodRecord>> {
        let moods = sqlx::query_as::<_, MoodRecord>(
            r#"
            SELECT * FROM mood
            WHERE sleep_id = $1
            ORDER BY "order" ASC
            "#,
        )
        .bind(sleep_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(moods)
    }
}
