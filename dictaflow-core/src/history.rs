use std::collections::VecDeque;

use serde::Serialize;

use crate::utils::now_epoch_ms;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: u64,
    pub timestamp_ms: u64,
    pub text: String,
}

/// Most-recent-first record of captured dictations, bounded to `capacity`.
#[derive(Debug)]
pub struct HistoryLog {
    items: VecDeque<HistoryItem>,
    capacity: usize,
    next_id: u64,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Records `text`; blank text is not recorded.
    pub fn push(&mut self, text: &str) -> Option<HistoryItem> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let item = HistoryItem {
            id: self.next_id,
            timestamp_ms: now_epoch_ms(),
            text: text.to_string(),
        };
        self.next_id += 1;

        self.items.push_front(item.clone());
        self.items.truncate(self.capacity);
        Some(item)
    }

    pub fn items(&self) -> Vec<HistoryItem> {
        self.items.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&HistoryItem> {
        self.items.front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
