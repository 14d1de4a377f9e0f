//! Fan-out/fan-in between the client-facing "sleep entry" shape and the
//! stored rows behind it: one sleep row plus up to three mood rows keyed by
//! the fixed slot ordinals. Creation splits the bundled shape into rows,
//! every read reassembles it, and partial updates reconcile mood slots by
//! `order` (update the existing record or insert a missing one).

use std::fmt;

use futures_util::future::try_join_all;

use crate::models::mood::{MoodRecord, MoodScores, MoodSlot};
use crate::models::sleep::{
    format_timestamp, FlattenedSleepView, NewSleep, SleepChanges, SleepFilter, SleepRecord,
    MS_PER_HOUR,
};
use crate::store::{RecordStore, StoreError};

/// Which storage operation an aggregation step was performing when it
/// failed. Carried on [`AggregateError::Persistence`] so callers can log
/// where a multi-write operation stopped; nothing written earlier is rolled
/// back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SleepInsert,
    SleepUpdate,
    SleepDelete,
    SleepFetch,
    MoodInsert,
    MoodUpdate,
    MoodFetch,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::SleepInsert => "sleep insert",
            Step::SleepUpdate => "sleep update",
            Step::SleepDelete => "sleep delete",
            Step::SleepFetch => "sleep fetch",
            Step::MoodInsert => "mood insert",
            Step::MoodUpdate => "mood update",
            Step::MoodFetch => "mood fetch",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("sleep entry {0} not found")]
    NotFound(i64),

    #[error("storage operation failed during {step}")]
    Persistence {
        step: Step,
        #[source]
        source: StoreError,
    },
}

impl AggregateError {
    fn at(step: Step) -> impl FnOnce(StoreError) -> AggregateError {
        move |source| AggregateError::Persistence { step, source }
    }
}

pub type AggResult<T> = Result<T, AggregateError>;

pub struct SleepMoodAggregator<S> {
    store: S,
}

impl<S: RecordStore> SleepMoodAggregator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Merge one sleep row with its mood rows into the flattened shape.
    /// Slots with no matching record stay absent; "no mood recorded yet" is
    /// a valid state, never an error. Duration is a pure arithmetic
    /// pass-through and may be zero or negative.
    pub fn assemble(sleep: &SleepRecord, moods: &[MoodRecord]) -> FlattenedSleepView {
        let mut scores = MoodScores::default();
        for record in moods {
            if let Some(slot) = MoodSlot::from_ordinal(record.order) {
                scores.set(slot, record.mood_score);
            }
        }

        FlattenedSleepView {
            id: sleep.id,
            user_id: sleep.user_id,
            sleep_start: sleep.sleep_start,
            sleep_end: sleep.sleep_end,
            start_formatted: format_timestamp(sleep.sleep_start),
            end_formatted: format_timestamp(sleep.sleep_end),
            sleep_goal: sleep.sleep_goal,
            sleep_hours: (sleep.sleep_end - sleep.sleep_start) as f64 / MS_PER_HOUR,
            moods: scores,
        }
    }

    /// Insert a sleep row, then one mood row per truthy slot. The mood
    /// inserts touch disjoint ordinals and run concurrently; the re-read is
    /// sequenced after all of them so the returned view never shows a
    /// partial state. A failed mood insert surfaces as-is and does not roll
    /// back the sleep row or sibling moods.
    pub async fn create_with_moods(
        &self,
        fields: NewSleep,
        moods: MoodScores,
    ) -> AggResult<FlattenedSleepView> {
        let sleep = self
            .store
            .insert_sleep(fields)
            .await
            .map_err(AggregateError::at(Step::SleepInsert))?;

        let inserts: Vec<_> = moods
            .truthy()
            .present()
            .map(|(slot, score)| self.store.insert_mood(sleep.id, slot.ordinal(), score))
            .collect();
        try_join_all(inserts)
            .await
            .map_err(AggregateError::at(Step::MoodInsert))?;

        // Re-read rather than trusting the insert results.
        let mood_rows = self
            .store
            .find_mood_by_sleep_id(sleep.id)
            .await
            .map_err(AggregateError::at(Step::MoodFetch))?;

        Ok(Self::assemble(&sleep, &mood_rows))
    }

    /// Apply a partial update to the sleep row, then reconcile the truthy
    /// mood changes against the existing records: a slot whose record
    /// already exists gets its score updated in place (matched by `order`,
    /// not by id), a slot with no record gets a fresh insert. Untouched
    /// slots are left exactly as they were.
    pub async fn update_with_moods(
        &self,
        sleep_id: i64,
        changes: SleepChanges,
        mood_changes: MoodScores,
    ) -> AggResult<FlattenedSleepView> {
        let changes = changes.truthy();
        if !changes.is_empty() {
            let affected = self
                .store
                .update_sleep(sleep_id, changes)
                .await
                .map_err(AggregateError::at(Step::SleepUpdate))?;
            if affected == 0 {
                return Err(AggregateError::NotFound(sleep_id));
            }
        }

        let existing = self
            .store
            .find_mood_by_sleep_id(sleep_id)
            .await
            .map_err(AggregateError::at(Step::MoodFetch))?;

        for (slot, score) in mood_changes.truthy().present() {
            match existing.iter().find(|m| m.order == slot.ordinal()) {
                Some(record) => {
                    self.store
                        .update_mood(record.id, score)
                        .await
                        .map_err(AggregateError::at(Step::MoodUpdate))?;
                }
                None => {
                    self.store
                        .insert_mood(sleep_id, slot.ordinal(), score)
                        .await
                        .map_err(AggregateError::at(Step::MoodInsert))?;
                }
            }
        }

        let sleep = self.fetch_sleep(sleep_id).await?;
        let mood_rows = self
            .store
            .find_mood_by_sleep_id(sleep_id)
            .await
            .map_err(AggregateError::at(Step::MoodFetch))?;

        Ok(Self::assemble(&sleep, &mood_rows))
    }

    pub async fn view(&self, sleep_id: i64) -> AggResult<FlattenedSleepView> {
        let sleep = self.fetch_sleep(sleep_id).await?;
        let mood_rows = self
            .store
            .find_mood_by_sleep_id(sleep_id)
            .await
            .map_err(AggregateError::at(Step::MoodFetch))?;

        Ok(Self::assemble(&sleep, &mood_rows))
    }

    /// Flattened views for every sleep row matching the filter.
    pub async fn list_views(&self, filter: SleepFilter) -> AggResult<Vec<FlattenedSleepView>> {
        let sleeps = self
            .store
            .find_sleep_by(filter)
            .await
            .map_err(AggregateError::at(Step::SleepFetch))?;

        let mut views = Vec::with_capacity(sleeps.len());
        for sleep in &sleeps {
            let mood_rows = self
                .store
                .find_mood_by_sleep_id(sleep.id)
                .await
                .map_err(AggregateError::at(Step::MoodFetch))?;
            views.push(Self::assemble(sleep, &mood_rows));
        }

        Ok(views)
    }

    /// Remove a sleep entry; its mood records go with it (cascade).
    pub async fn delete(&self, sleep_id: i64) -> AggResult<()> {
        let affected = self
            .store
            .delete_sleep(sleep_id)
            .await
            .map_err(AggregateError::at(Step::SleepDelete))?;
        if affected == 0 {
            return Err(AggregateError::NotFound(sleep_id));
        }
        Ok(())
    }

    async fn fetch_sleep(&self, sleep_id: i64) -> AggResult<SleepRecord> {
        let mut sleeps = self
            .store
            .find_sleep_by(SleepFilter::by_id(sleep_id))
            .await
            .map_err(AggregateError::at(Step::SleepFetch))?;
        sleeps
            .pop()
            .ok_or(AggregateError::NotFound(sleep_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreResult;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Inner {
        sleeps: Vec<SleepRecord>,
        moods: Vec<MoodRecord>,
        next_sleep_id: i64,
        next_mood_id: i64,
    }

    /// In-memory store mirroring the Postgres semantics the aggregator
    /// relies on: store-assigned ids, rows-affected counts, cascade delete,
    /// and the unique (sleep_id, order) index.
    #[derive(Clone, Default)]
    struct MemStore {
        inner: Arc<Mutex<Inner>>,
    }

    impl MemStore {
        fn moods_for(&self, sleep_id: i64) -> Vec<MoodRecord> {
            let inner = self.inner.lock().unwrap();
            inner
                .moods
                .iter()
                .filter(|m| m.sleep_id == sleep_id)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl RecordStore for MemStore {
        async fn insert_sleep(&self, fields: NewSleep) -> StoreResult<SleepRecord> {
            let mut inner = self.inner.lock().unwrap();
            inner.next_sleep_id += 1;
            let sleep = SleepRecord {
                id: inner.next_sleep_id,
                sleep_start: fields.sleep_start,
                sleep_end: fields.sleep_end,
                sleep_goal: fields.sleep_goal,
                user_id: fields.user_id,
            };
            inner.sleeps.push(sleep.clone());
            Ok(sleep)
        }

        async fn update_sleep(&self, id: i64, changes: SleepChanges) -> StoreResult<u64> {
            let mut inner = self.inner.lock().unwrap();
            match inner.sleeps.iter_mut().find(|s| s.id == id) {
                Some(sleep) => {
                    if let Some(start) = changes.sleep_start {
                        sleep.sleep_start = start;
                    }
                    if let Some(end) = changes.sleep_end {
                        sleep.sleep_end = end;
                    }
                    if let Some(goal) = changes.sleep_goal {
                        sleep.sleep_goal = Some(goal);
                    }
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        async fn delete_sleep(&self, id: i64) -> StoreResult<u64> {
            let mut inner = self.inner.lock().unwrap();
            let before = inner.sleeps.len();
            inner.sleeps.retain(|s| s.id != id);
            let removed = (before - inner.sleeps.len()) as u64;
            if removed > 0 {
                inner.moods.retain(|m| m.sleep_id != id);
            }
            Ok(removed)
        }

        async fn find_sleep_by(&self, filter: SleepFilter) -> StoreResult<Vec<SleepRecord>> {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .sleeps
                .iter()
                .filter(|s| filter.id.map_or(true, |id| s.id == id))
                .filter(|s| filter.user_id.map_or(true, |uid| s.user_id == uid))
                .filter(|s| {
                    s.sleep_start >= filter.start_after && s.sleep_start <= filter.start_before
                })
                .cloned()
                .collect())
        }

        async fn insert_mood(
            &self,
            sleep_id: i64,
            order: i32,
            score: i32,
        ) -> StoreResult<MoodRecord> {
            let mut inner = self.inner.lock().unwrap();
            if inner
                .moods
                .iter()
                .any(|m| m.sleep_id == sleep_id && m.order == order)
            {
                return Err(sqlx::Error::Protocol(
                    "duplicate key value violates unique constraint".into(),
                )
                .into());
            }
            inner.next_mood_id += 1;
            let mood = MoodRecord {
                id: inner.next_mood_id,
                sleep_id,
                order,
                mood_score: score,
            };
            inner.moods.push(mood.clone());
            Ok(mood)
        }

        async fn update_mood(&self, id: i64, score: i32) -> StoreResult<u64> {
            let mut inner = self.inner.lock().unwrap();
            match inner.moods.iter_mut().find(|m| m.id == id) {
                Some(mood) => {
                    mood.mood_score = score;
                    Ok(1)
                }
                None => Ok(0),
            }
        }

        async fn find_mood_by_sleep_id(&self, sleep_id: i64) -> StoreResult<Vec<MoodRecord>> {
            let mut moods = self.moods_for(sleep_id);
            moods.sort_by_key(|m| m.order);
            Ok(moods)
        }
    }

    fn scores(waking: Option<i32>, day: Option<i32>, bedtime: Option<i32>) -> MoodScores {
        MoodScores {
            mood_waking: waking,
            mood_day: day,
            mood_bedtime: bedtime,
        }
    }

    fn night(user_id: i64) -> NewSleep {
        NewSleep {
            sleep_start: 1_608_512_400_000,
            sleep_end: 1_608_552_000_000,
            sleep_goal: Some(8),
            user_id,
        }
    }

    fn aggregator() -> (SleepMoodAggregator<MemStore>, MemStore) {
        let store = MemStore::default();
        (SleepMoodAggregator::new(store.clone()), store)
    }

    #[tokio::test]
    async fn create_round_trips_all_truthy_slots() {
        let (agg, _) = aggregator();
        let view = agg
            .create_with_moods(night(1), scores(Some(3), Some(3), Some(3)))
            .await
            .unwrap();

        assert_eq!(view.user_id, 1);
        assert_eq!(view.moods.mood_waking, Some(3));
        assert_eq!(view.moods.mood_day, Some(3));
        assert_eq!(view.moods.mood_bedtime, Some(3));
        assert_eq!(view.sleep_hours, 11.0);
    }

    #[tokio::test]
    async fn create_with_one_slot_leaves_others_absent() {
        let (agg, store) = aggregator();
        let view = agg
            .create_with_moods(night(1), scores(None, Some(2), None))
            .await
            .unwrap();

        assert_eq!(view.moods.mood_waking, None);
        assert_eq!(view.moods.mood_day, Some(2));
        assert_eq!(view.moods.mood_bedtime, None);
        assert_eq!(store.moods_for(view.id).len(), 1);
    }

    #[tokio::test]
    async fn update_mutates_existing_slot_in_place() {
        let (agg, store) = aggregator();
        let created = agg
            .create_with_moods(night(1), scores(Some(3), None, None))
            .await
            .unwrap();
        let before = store.moods_for(created.id);
        let (original_id, original_order) = (before[0].id, before[0].order);

        let updated = agg
            .update_with_moods(
                created.id,
                SleepChanges::default(),
                scores(Some(4), None, None),
            )
            .await
            .unwrap();
        assert_eq!(updated.moods.mood_waking, Some(4));

        let moods = store.moods_for(created.id);
        assert_eq!(moods.len(), 1);
        assert_eq!(moods[0].id, original_id);
        assert_eq!(moods[0].order, original_order);
        assert_eq!(moods[0].mood_score, 4);

        let viewed = agg.view(created.id).await.unwrap();
        assert_eq!(viewed.moods.mood_waking, Some(4));
    }

    #[tokio::test]
    async fn update_creates_missing_slot_and_keeps_the_rest() {
        let (agg, store) = aggregator();
        let created = agg
            .create_with_moods(night(1), scores(Some(3), Some(1), None))
            .await
            .unwrap();

        let updated = agg
            .update_with_moods(
                created.id,
                SleepChanges::default(),
                scores(None, None, Some(2)),
            )
            .await
            .unwrap();

        assert_eq!(updated.moods.mood_waking, Some(3));
        assert_eq!(updated.moods.mood_day, Some(1));
        assert_eq!(updated.moods.mood_bedtime, Some(2));

        let moods = store.moods_for(created.id);
        assert_eq!(moods.len(), 3);
        let bedtime: Vec<_> = moods.iter().filter(|m| m.order == 3).collect();
        assert_eq!(bedtime.len(), 1);
        assert_eq!(bedtime[0].mood_score, 2);
    }

    #[tokio::test]
    async fn zero_score_update_is_a_no_op() {
        let (agg, store) = aggregator();
        let created = agg
            .create_with_moods(night(1), scores(None, Some(3), None))
            .await
            .unwrap();

        let updated = agg
            .update_with_moods(
                created.id,
                SleepChanges::default(),
                scores(None, Some(0), None),
            )
            .await
            .unwrap();

        assert_eq!(updated.moods.mood_day, Some(3));
        let moods = store.moods_for(created.id);
        assert_eq!(moods.len(), 1);
        assert_eq!(moods[0].mood_score, 3);
    }

    #[tokio::test]
    async fn delete_cascades_to_mood_records() {
        let (agg, store) = aggregator();
        let created = agg
            .create_with_moods(night(1), scores(Some(3), Some(3), Some(3)))
            .await
            .unwrap();
        assert_eq!(store.moods_for(created.id).len(), 3);

        agg.delete(created.id).await.unwrap();

        assert!(store.find_mood_by_sleep_id(created.id).await.unwrap().is_empty());
        assert!(matches!(
            agg.view(created.id).await,
            Err(AggregateError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duration_is_plain_arithmetic_even_when_negative() {
        let (agg, _) = aggregator();
        let view = agg
            .create_with_moods(
                NewSleep {
                    sleep_start: 1_608_552_000_000,
                    sleep_end: 1_608_512_400_000,
                    sleep_goal: None,
                    user_id: 1,
                },
                MoodScores::default(),
            )
            .await
            .unwrap();

        assert_eq!(view.sleep_hours, -11.0);
    }

    #[tokio::test]
    async fn assemble_tolerates_an_empty_mood_list() {
        let sleep = SleepRecord {
            id: 7,
            sleep_start: 1_608_512_400_000,
            sleep_end: 1_608_512_400_000,
            sleep_goal: None,
            user_id: 2,
        };
        let view = SleepMoodAggregator::<MemStore>::assemble(&sleep, &[]);

        assert_eq!(view.sleep_hours, 0.0);
        assert_eq!(view.moods.mood_waking, None);
        assert_eq!(view.moods.mood_day, None);
        assert_eq!(view.moods.mood_bedtime, None);
    }

    #[tokio::test]
    async fn update_of_unknown_sleep_id_is_not_found() {
        let (agg, _) = aggregator();
        let result = agg
            .update_with_moods(
                99,
                SleepChanges {
                    sleep_goal: Some(9),
                    ..SleepChanges::default()
                },
                MoodScores::default(),
            )
            .await;
        assert!(matches!(result, Err(AggregateError::NotFound(99))));

        // Mood-only updates against a missing id fail on the re-read.
        let result = agg
            .update_with_moods(99, SleepChanges::default(), scores(Some(2), None, None))
            .await;
        assert!(matches!(result, Err(AggregateError::NotFound(99))));
    }

    #[tokio::test]
    async fn create_then_partial_update_end_to_end() {
        let (agg, _) = aggregator();
        let created = agg
            .create_with_moods(
                NewSleep {
                    sleep_start: 1_585_782_000_000,
                    sleep_end: 1_585_832_400_000,
                    sleep_goal: Some(11),
                    user_id: 3,
                },
                scores(Some(4), Some(1), Some(4)),
            )
            .await
            .unwrap();

        let viewed = agg.view(created.id).await.unwrap();
        assert_eq!(viewed.sleep_hours, 14.0);
        assert_eq!(viewed.moods.mood_waking, Some(4));
        assert_eq!(viewed.moods.mood_day, Some(1));
        assert_eq!(viewed.moods.mood_bedtime, Some(4));

        agg.update_with_moods(
            created.id,
            SleepChanges::default(),
            scores(None, None, Some(2)),
        )
        .await
        .unwrap();

        let after = agg.view(created.id).await.unwrap();
        assert_eq!(after.moods.mood_waking, Some(4));
        assert_eq!(after.moods.mood_day, Some(1));
        assert_eq!(after.moods.mood_bedtime, Some(2));
        assert_eq!(after.sleep_goal, Some(11));
    }

    #[tokio::test]
    async fn mood_insert_failure_reports_the_step_without_rollback() {
        let (agg, store) = aggregator();
        // Plant a conflicting waking record under the id the next sleep
        // insert will receive, so the mood fan-out fails mid-create.
        store
            .insert_mood(1, MoodSlot::Waking.ordinal(), 2)
            .await
            .unwrap();

        let err = agg
            .create_with_moods(night(1), scores(Some(3), None, None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AggregateError::Persistence {
                step: Step::MoodInsert,
                ..
            }
        ));

        // The sleep row written before the failing mood insert is kept.
        assert!(agg.view(1).await.is_ok());
    }
}
