use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One mood check-in tied to a sleep entry. `order` identifies which of the
/// three fixed slots this record fills (see [`MoodSlot`]).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MoodRecord {
    pub id: i64,
    pub sleep_id: i64,
    pub order: i32,
    pub mood_score: i32,
}

/// The three fixed check-in points of a sleep entry and their ordinals.
/// waking = 1, day = 2, bedtime = 3. The mapping is used forward when
/// fanning out writes and in reverse when reassembling reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodSlot {
    Waking,
    Day,
    Bedtime,
}

impl MoodSlot {
    pub const ALL: [MoodSlot; 3] = [MoodSlot::Waking, MoodSlot::Day, MoodSlot::Bedtime];

    pub fn ordinal(self) -> i32 {
        match self {
            MoodSlot::Waking => 1,
            MoodSlot::Day => 2,
            MoodSlot::Bedtime => 3,
        }
    }

    pub fn from_ordinal(order: i32) -> Option<MoodSlot> {
        match order {
            1 => Some(MoodSlot::Waking),
            2 => Some(MoodSlot::Day),
            3 => Some(MoodSlot::Bedtime),
            _ => None,
        }
    }
}

/// The named mood scores as they travel with a sleep entry on the wire.
/// Scores run 1..=4 by convention; a zero is treated the same as an absent
/// field and never written (the API has always behaved this way, so clients
/// cannot record a literal zero).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MoodScores {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_waking: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_day: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood_bedtime: Option<i32>,
}

impl MoodScores {
    pub fn get(&self, slot: MoodSlot) -> Option<i32> {
        match slot {
            MoodSlot::Waking => self.mood_waking,
            MoodSlot::Day => self.mood_day,
            MoodSlot::Bedtime => self.mood_bedtime,
        }
    }

    pub fn set(&mut self, slot: MoodSlot, score: i32) {
        match slot {
            MoodSlot::Waking => self.mood_waking = Some(score),
            MoodSlot::Day => self.mood_day = Some(score),
            MoodSlot::Bedtime => self.mood_bedtime = Some(score),
        }
    }

    /// Drop zero-valued entries so they cannot overwrite stored scores.
    pub fn truthy(self) -> MoodScores {
        MoodScores {
            mood_waking: self.mood_waking.filter(|s| *s != 0),
            mood_day: self.mood_day.filter(|s| *s != 0),
            mood_bedtime: self.mood_bedtime.filter(|s| *s != 0),
        }
    }

    /// (slot, score) pairs for every slot that carries a truthy score.
    pub fn present(&self) -> impl Iterator<Item = (MoodSlot, i32)> + '_ {
        MoodSlot::ALL
            .into_iter()
            .filter_map(|slot| self.get(slot).map(|score| (slot, score)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_round_trip() {
        for slot in MoodSlot::ALL {
            assert_eq!(MoodSlot::from_ordinal(slot.ordinal()), Some(slot));
        }
        assert_eq!(MoodSlot::from_ordinal(0), None);
        assert_eq!(MoodSlot::from_ordinal(4), None);
    }

    #[test]
    fn truthy_drops_zero_scores() {
        let scores = MoodScores {
            mood_waking: Some(3),
            mood_day: Some(0),
            mood_bedtime: None,
        };
        let filtered = scores.truthy();
        assert_eq!(filtered.mood_waking, Some(3));
        assert_eq!(filtered.mood_day, None);
        assert_eq!(filtered.mood_bedtime, None);
    }

    #[test]
    fn present_yields_slots_in_ordinal_order() {
        let scores = MoodScores {
            mood_waking: Some(4),
            mood_day: None,
            mood_bedtime: Some(2),
        };
        let pairs: Vec<_> = scores.present().collect();
        assert_eq!(pairs, vec![(MoodSlot::Waking, 4), (MoodSlot::Bedtime, 2)]);
    }
}
