use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{keys, Storage};

pub const HISTORY_CAPACITY: usize = 10;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub text: String,
}

/// Revision snapshots, newest first, never longer than [`HISTORY_CAPACITY`].
///
/// Entries are labelled in the UI by display rank: the newest of `n` entries
/// is `#n`, the oldest `#1`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn from_entries(mut entries: Vec<HistoryEntry>) -> Self {
        entries.truncate(HISTORY_CAPACITY);
        Self { entries }
    }

    pub fn load(storage: &Storage) -> Self {
        storage
            .get_json::<Vec<HistoryEntry>>(keys::HISTORY)
            .map(Self::from_entries)
            .unwrap_or_default()
    }

    /// The whole list is rewritten on every mutation.
    pub fn persist(&self, storage: &mut Storage) {
        storage.set_json(keys::HISTORY, &self.entries);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn newest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    /// Prepends `entry`, returning the evicted oldest entry on overflow.
    pub fn push(&mut self, entry: HistoryEntry) -> Option<HistoryEntry> {
        self.entries.insert(0, entry);
        if self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop()
        } else {
            None
        }
    }

    pub fn ranked(&self) -> impl Iterator<Item = (usize, &HistoryEntry)> + '_ {
        let len = self.entries.len();
        self.entries
            .iter()
            .enumerate()
            .map(move |(index, entry)| (len - index, entry))
    }

    fn index_of_rank(&self, rank: usize) -> Option<usize> {
        if rank == 0 || rank > self.entries.len() {
            return None;
        }
        Some(self.entries.len() - rank)
    }

    pub fn remove_rank(&mut self, rank: usize) -> Option<HistoryEntry> {
        self.index_of_rank(rank)
            .map(|index| self.entries.remove(index))
    }
}
