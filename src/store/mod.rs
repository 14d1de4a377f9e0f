pub mod postgres;

use async_trait::async_trait;

use crate::models::mood::MoodRecord;
use crate::models::sleep::{NewSleep, SleepChanges, SleepFilter, SleepRecord};

pub use postgres::PgRecordStore;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct StoreError(#[from] sqlx::Error);

pub type StoreResult<T> = Result<T, StoreError>;

/// Narrow persistence interface for the two record kinds the aggregator
/// fans out over. Update and delete report the number of affected rows so
/// callers can distinguish "not found" from success.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_sleep(&self, fields: NewSleep) -> StoreResult<SleepRecord>;
    async fn update_sleep(&self, id: i64, changes: SleepChanges) -> StoreResult<u64>;
    async fn delete_sleep(&self, id: i64) -> StoreResult<u64>;
    async fn find_sleep_by(&self, filter: SleepFilter) -> StoreResult<Vec<SleepRecord>>;
    async fn insert_mood(&self, sleep_id: i64, order: i32, score: i32) -> StoreResult<MoodRecord>;
    async fn update_mood(&self, id: i64, score: i32) -> StoreResult<u64>;
    /// All mood rows of one sleep entry, ordered by `order` ascending.
    async fn find_mood_by_sleep_id(&self, sleep_id: i64) -> StoreResult<Vec<MoodRecord>>;
}
