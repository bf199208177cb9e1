//! Bounded history stack
//!
//! Entries are kept in visit order. Pushing while forward entries exist
//! discards that forward branch, the way a browser does, and the oldest
//! entries are evicted once the capacity is exceeded.

use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: VecDeque<String>,
    current: usize,
    capacity: usize,
}

impl HistoryStack {
    /// `capacity` is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            current: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_path(&self) -> Option<&str> {
        self.get(self.current)
    }

    pub fn can_go_back(&self) -> bool {
        self.current > 0
    }

    pub fn can_go_forward(&self) -> bool {
        !self.entries.is_empty() && self.current < self.entries.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    /// First position holding `path`
    pub fn position(&self, path: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry == path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.position(path).is_some()
    }

    pub fn paths(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    /// Append `path` as the new current entry.
    ///
    /// Returns the number of entries evicted from the front.
    pub fn push(&mut self, path: impl Into<String>) -> usize {
        if self.can_go_forward() {
            self.entries.truncate(self.current + 1);
        }

        self.entries.push_back(path.into());
        let evicted = self.evict();
        self.current = self.entries.len() - 1;
        evicted
    }

    /// Move the current pointer. Out-of-range indices are refused.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.current = index;
        true
    }

    /// Replace the whole history with a single entry.
    pub fn reset(&mut self, path: impl Into<String>) {
        self.entries.clear();
        self.entries.push_back(path.into());
        self.current = 0;
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current = 0;
    }

    fn evict(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
            evicted += 1;
        }
        self.current = self.current.saturating_sub(evicted);
        evicted
    }
}
