// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Journal Store: daily reflections, at most one per program day.

use std::sync::{Arc, Mutex};

use super::{keys, KvStore, StoreError};
use crate::models::JournalEntry;

#[derive(Clone)]
pub struct JournalStore {
    kv: Arc<dyn KvStore>,
    write_lock: Arc<Mutex<()>>,
}

impl JournalStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// All entries in storage order (unsorted).
    pub fn list(&self) -> Vec<JournalEntry> {
        match self.kv.get(keys::JOURNAL) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Stored journal is corrupt, treating as empty");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read journal, treating as empty");
                Vec::new()
            }
        }
    }

    /// Insert `entry`, replacing any existing entry for the same day.
    pub fn save(&self, entry: JournalEntry) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.list();
        entries.retain(|e| e.day != entry.day);
        tracing::debug!(day = entry.day, "Saving journal entry");
        entries.push(entry);

        let raw = serde_json::to_string(&entries)?;
        self.kv.set(keys::JOURNAL, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JournalAnswer;
    use crate::store::MemoryKv;
    use chrono::{TimeZone, Utc};

    fn entry(day: u32, hour: u32, answer: &str) -> JournalEntry {
        JournalEntry {
            day,
            date: Utc.with_ymd_and_hms(2026, 4, day, hour, 0, 0).unwrap(),
            answers: vec![JournalAnswer {
                prompt: "What cravings did you face today?".to_string(),
                answer: answer.to_string(),
            }],
        }
    }

    #[test]
    fn test_same_day_is_replaced() {
        let journal = JournalStore::new(Arc::new(MemoryKv::new()));
        journal.save(entry(3, 9, "first")).unwrap();
        journal.save(entry(4, 9, "other day")).unwrap();
        journal.save(entry(3, 21, "second")).unwrap();

        let entries = journal.list();
        assert_eq!(entries.len(), 2);

        let day3: Vec<_> = entries.iter().filter(|e| e.day == 3).collect();
        assert_eq!(day3.len(), 1);
        assert_eq!(day3[0], &entry(3, 21, "second"));
    }

    #[test]
    fn test_concurrent_saves_keep_every_day() {
        let journal = JournalStore::new(Arc::new(MemoryKv::new()));

        std::thread::scope(|s| {
            for day in 1..=8 {
                let journal = journal.clone();
                s.spawn(move || journal.save(entry(day, 9, "steady")).unwrap());
            }
        });

        let mut days: Vec<u32> = journal.list().iter().map(|e| e.day).collect();
        days.sort_unstable();
        assert_eq!(days, (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_corrupt_journal_reads_as_empty() {
        let kv = Arc::new(MemoryKv::new());
        kv.set(keys::JOURNAL, "{\"day\": 1}").unwrap();
        let journal = JournalStore::new(kv);

        assert!(journal.list().is_empty());

        // Saving over corrupt data starts a fresh list
        journal.save(entry(1, 8, "fresh")).unwrap();
        assert_eq!(journal.list().len(), 1);
    }
}
