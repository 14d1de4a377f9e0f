use chrono::DateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::mood::MoodScores;

/// Milliseconds in one hour, the divisor for `sleep_hours`.
pub const MS_PER_HOUR: f64 = 3_600_000.0;

/// Sentinel range bounds for time filtering: 1900-01-01 to 9999-12-31.
pub const EARLIEST_TRACKED_MS: i64 = -2_208_970_800_000;
pub const LATEST_TRACKED_MS: i64 = 253_402_232_400_000;

/// One night's sleep window as stored. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SleepRecord {
    pub id: i64,
    pub sleep_start: i64,
    pub sleep_end: i64,
    pub sleep_goal: Option<i32>,
    pub user_id: i64,
}

/// Insert payload for a sleep row; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewSleep {
    pub sleep_start: i64,
    pub sleep_end: i64,
    pub sleep_goal: Option<i32>,
    pub user_id: i64,
}

/// Partial update for a sleep row. Absent fields are left untouched, and a
/// zero timestamp or goal is dropped the same way an absent field is.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepChanges {
    pub sleep_start: Option<i64>,
    pub sleep_end: Option<i64>,
    pub sleep_goal: Option<i32>,
}

impl SleepChanges {
    pub fn truthy(self) -> SleepChanges {
        SleepChanges {
            sleep_start: self.sleep_start.filter(|v| *v != 0),
            sleep_end: self.sleep_end.filter(|v| *v != 0),
            sleep_goal: self.sleep_goal.filter(|v| *v != 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sleep_start.is_none() && self.sleep_end.is_none() && self.sleep_goal.is_none()
    }
}

/// Filter for sleep lookups. `start_after`/`start_before` bound the
/// `sleep_start` column; they default to the full tracked range.
#[derive(Debug, Clone, Copy)]
pub struct SleepFilter {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub start_after: i64,
    pub start_before: i64,
}

impl Default for SleepFilter {
    fn default() -> Self {
        Self {
            id: None,
            user_id: None,
            start_after: EARLIEST_TRACKED_MS,
            start_before: LATEST_TRACKED_MS,
        }
    }
}

impl SleepFilter {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }
}

/// Request body for creating a sleep entry: the sleep window plus up to
/// three bundled mood scores.
#[derive(Debug, Deserialize)]
pub struct CreateSleepRequest {
    pub sleep_start: i64,
    pub sleep_end: i64,
    pub sleep_goal: Option<i32>,
    #[serde(flatten)]
    pub moods: MoodScores,
}

/// Request body for a partial update of a sleep entry and/or its moods.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSleepRequest {
    pub sleep_start: Option<i64>,
    pub sleep_end: Option<i64>,
    pub sleep_goal: Option<i32>,
    #[serde(flatten)]
    pub moods: MoodScores,
}

#[derive(Debug, Deserialize)]
pub struct SleepRangeQuery {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// The presentation-ready shape merging a sleep row with its mood rows:
/// raw and formatted timestamps, computed duration, and the three named
/// mood slots (absent when no mood was recorded for a slot).
#[derive(Debug, Clone, Serialize)]
pub struct FlattenedSleepView {
    pub id: i64,
    pub user_id: i64,
    pub sleep_start: i64,
    pub sleep_end: i64,
    pub start_formatted: String,
    pub end_formatted: String,
    pub sleep_goal: Option<i32>,
    pub sleep_hours: f64,
    #[serde(flatten)]
    pub moods: MoodScores,
}

/// Render an epoch-millisecond timestamp as "MM/DD/YYYY h:mm AM/PM" in UTC.
/// Out-of-range values fall back to the raw number so a bad row still
/// serializes.
pub fn format_timestamp(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.format("%m/%d/%Y %-I:%M %p").to_string(),
        None => ms.to_string(),
    }
}
