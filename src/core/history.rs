/// Interaction history and the "mind garden" summary derived from it.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::sync::{Arc, Mutex};

use crate::core::store::{KeyValueStore, MemoryStore, StoreError};
use crate::schema::mood::MoodCategory;
use crate::schema::quest::HistoryEntry;

/// Store key holding the JSON array of history entries.
pub const HISTORY_KEY: &str = "mind_sync_history";

/// Capped feedback log, most recent first.
pub struct InteractionHistory {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
    entries: Mutex<Vec<HistoryEntry>>,
}

impl InteractionHistory {
    pub fn open(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        let mut entries = match store.get(HISTORY_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Discarding corrupt interaction history: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read interaction history: {}", e);
                Vec::new()
            }
        };
        entries.truncate(capacity);

        Self {
            store,
            capacity,
            entries: Mutex::new(entries),
        }
    }

    pub fn in_memory(capacity: usize) -> Self {
        Self::open(Arc::new(MemoryStore::new()), capacity)
    }

    /// Prepend an entry, drop the oldest past capacity, and persist. The
    /// in-memory history keeps the entry even when persisting fails.
    pub fn record(&self, entry: HistoryEntry) -> Result<(), StoreError> {
        let mut entries = self.lock();
        entries.insert(0, entry);
        entries.truncate(self.capacity);
        let snapshot = serde_json::to_string(&*entries)?;
        self.store.set(HISTORY_KEY, &snapshot)
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<HistoryEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for InteractionHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionHistory")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

/// Growth stage of the garden, by number of completed quests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GardenLevel {
    SeedWatcher,
    SproutExplorer,
    Apprentice,
    Caretaker,
    Master,
}

impl GardenLevel {
    pub fn for_total(total: usize) -> Self {
        match total {
            t if t >= 30 => Self::Master,
            t if t >= 15 => Self::Caretaker,
            t if t >= 7 => Self::Apprentice,
            t if t >= 3 => Self::SproutExplorer,
            _ => Self::SeedWatcher,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::SeedWatcher => "Seed watcher",
            Self::SproutExplorer => "Sprout explorer",
            Self::Apprentice => "Garden apprentice",
            Self::Caretaker => "Mind caretaker",
            Self::Master => "Mind master",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GardenStats {
    pub total: usize,
    /// Distinct calendar days (UTC) with at least one entry.
    pub active_days: usize,
    pub level: GardenLevel,
}

impl GardenStats {
    pub fn from_history(entries: &[HistoryEntry]) -> Self {
        let days: FxHashSet<NaiveDate> = entries.iter().map(|e| e.timestamp.date_naive()).collect();
        Self {
            total: entries.len(),
            active_days: days.len(),
            level: GardenLevel::for_total(entries.len()),
        }
    }
}

/// The mood of one day in the garden calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayMood {
    pub date: NaiveDate,
    /// Category of that day's most recent entry, if any.
    pub mood: Option<MoodCategory>,
}

/// The last `days` days ending at `today`, oldest first.
pub fn mood_map(entries: &[HistoryEntry], today: NaiveDate, days: u32) -> Vec<DayMood> {
    (0..days as i64)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            // entries are most recent first
            let mood = entries
                .iter()
                .find(|e| e.timestamp.date_naive() == date)
                .and_then(|e| e.mood_category);
            DayMood { date, mood }
        })
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryExport<'a> {
    activity: &'a [HistoryEntry],
    exported_at: String,
}

/// Pretty JSON dump of the history, stamped with the export time.
pub fn export_json(
    entries: &[HistoryEntry],
    exported_at: DateTime<Utc>,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&HistoryExport {
        activity: entries,
        exported_at: exported_at.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::quest::FeedbackScore;
    use chrono::TimeZone;

    fn entry_at(day: u32, hour: u32, category: Option<MoodCategory>) -> HistoryEntry {
        HistoryEntry {
            quest_title: format!("quest on {} at {}", day, hour),
            score: FeedbackScore::Positive,
            timestamp: Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap(),
            mood_category: category,
            mood_label: None,
            quest_type: Some("breathing".to_string()),
            quest_id: Some("b2".to_string()),
        }
    }

    #[test]
    fn record_caps_and_orders() {
        let history = InteractionHistory::in_memory(50);
        for i in 0..60 {
            history.record(entry_at(1 + (i % 28), 9, None)).unwrap();
        }
        assert_eq!(history.len(), 50);
        // most recent first: the last recorded entry was i = 59 -> day 4
        assert_eq!(history.entries()[0].quest_title, "quest on 4 at 9");
    }

    #[test]
    fn persists_and_reloads() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let history = InteractionHistory::open(store.clone(), 50);
        history
            .record(entry_at(2, 8, Some(MoodCategory::LowEnergy)))
            .unwrap();
        let reopened = InteractionHistory::open(store, 50);
        assert_eq!(reopened.entries(), history.entries());
    }

    #[test]
    fn corrupt_history_starts_empty() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, "[{\"questTitle\": 3}]").unwrap();
        assert!(InteractionHistory::open(store, 50).is_empty());
    }

    #[test]
    fn garden_levels() {
        assert_eq!(GardenLevel::for_total(0), GardenLevel::SeedWatcher);
        assert_eq!(GardenLevel::for_total(3), GardenLevel::SproutExplorer);
        assert_eq!(GardenLevel::for_total(7), GardenLevel::Apprentice);
        assert_eq!(GardenLevel::for_total(14), GardenLevel::Apprentice);
        assert_eq!(GardenLevel::for_total(15), GardenLevel::Caretaker);
        assert_eq!(GardenLevel::for_total(50), GardenLevel::Master);
    }

    #[test]
    fn stats_count_distinct_days() {
        let entries = vec![
            entry_at(5, 20, None),
            entry_at(5, 9, None),
            entry_at(3, 9, None),
        ];
        let stats = GardenStats::from_history(&entries);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active_days, 2);
        assert_eq!(stats.level, GardenLevel::SproutExplorer);
    }

    #[test]
    fn mood_map_uses_latest_entry_per_day() {
        let entries = vec![
            entry_at(5, 20, Some(MoodCategory::CalmRefresh)),
            entry_at(5, 9, Some(MoodCategory::HighStress)),
            entry_at(3, 9, Some(MoodCategory::LowEnergy)),
        ];
        let today = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let map = mood_map(&entries, today, 4);

        assert_eq!(map.len(), 4);
        assert_eq!(map[0].date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(map[0].mood, None);
        assert_eq!(map[1].mood, Some(MoodCategory::LowEnergy));
        assert_eq!(map[2].mood, None);
        assert_eq!(map[3].date, today);
        assert_eq!(map[3].mood, Some(MoodCategory::CalmRefresh));
    }

    #[test]
    fn export_contains_activity() {
        let entries = vec![entry_at(1, 12, Some(MoodCategory::PerformanceBoost))];
        let exported_at = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
        let json = export_json(&entries, exported_at).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["activity"][0]["moodCategory"], "performance_boost");
        assert_eq!(value["exportedAt"], "2026-03-02T00:00:00+00:00");
    }
}
