/*
 * history.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Lucciola, a browser for Gemini space.
 *
 * Lucciola is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Lucciola is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Lucciola.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Per-tab navigation history, shaped like the browser Web History API:
//! a linear list of visited entries with a cursor. Pushing while the cursor
//! sits behind the end discards the forward branch; pushing the same URL as
//! the newest entry is suppressed.

use chrono::{DateTime, Utc};

use crate::uri::GeminiUrl;

/// One visited location. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub url: GeminiUrl,
    pub visited_at: DateTime<Utc>,
    /// Short description for history UIs: the page's first heading or line.
    pub snippet: String,
}

impl HistoryEntry {
    pub fn new(url: GeminiUrl, snippet: impl Into<String>) -> Self {
        Self {
            url,
            visited_at: Utc::now(),
            snippet: snippet.into(),
        }
    }
}

/// Linear navigable history. `cursor` indexes the current entry and is only
/// meaningful while `items` is non-empty.
#[derive(Debug, Default)]
pub struct History {
    items: Vec<HistoryEntry>,
    cursor: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new state: discard everything after the cursor, append, and
    /// move the cursor to the new entry. Pushing a URL equal to the newest
    /// entry's is a no-op (consecutive identical locations never produce two
    /// entries).
    pub fn push_state(&mut self, entry: HistoryEntry) {
        if let Some(last) = self.items.last() {
            if last.url == entry.url {
                return;
            }
        }
        if self.cursor + 1 < self.items.len() {
            self.items.truncate(self.cursor + 1);
        }
        self.items.push(entry);
        self.cursor = self.items.len() - 1;
    }

    /// Replace the entry at the cursor in place; length and cursor are
    /// unchanged. With no current entry this degrades to a push.
    pub fn replace_state(&mut self, entry: HistoryEntry) {
        if self.cursor < self.items.len() {
            self.items[self.cursor] = entry;
        } else {
            self.push_state(entry);
        }
    }

    pub fn go_back(&mut self) {
        if self.can_go_back() {
            self.cursor -= 1;
        }
    }

    pub fn go_forward(&mut self) {
        if self.can_go_forward() {
            self.cursor += 1;
        }
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        !self.items.is_empty() && self.cursor < self.items.len() - 1
    }

    /// The entry at the cursor, or None while the history is empty.
    pub fn current_item(&self) -> Option<&HistoryEntry> {
        self.items.get(self.cursor)
    }

    pub fn items(&self) -> &[HistoryEntry] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every entry equal to the given one, clamping the cursor back
    /// into bounds.
    pub fn remove(&mut self, entry: &HistoryEntry) {
        self.items.retain(|e| e != entry);
        if !self.items.is_empty() {
            self.cursor = self.cursor.min(self.items.len() - 1);
        } else {
            self.cursor = 0;
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(s: &str) -> HistoryEntry {
        HistoryEntry::new(GeminiUrl::parse(s).unwrap(), s)
    }

    #[test]
    fn push_keeps_cursor_at_end() {
        let mut h = History::new();
        for url in ["gemini://a.example/", "gemini://b.example/", "gemini://c.example/"] {
            h.push_state(entry(url));
            assert_eq!(h.current_item().unwrap().url.to_string(), url);
        }
        assert_eq!(h.len(), 3);
        assert!(h.can_go_back());
        assert!(!h.can_go_forward());
    }

    #[test]
    fn duplicate_push_is_suppressed() {
        let mut h = History::new();
        h.push_state(entry("gemini://a.example/"));
        h.push_state(entry("gemini://a.example/"));
        assert_eq!(h.len(), 1);
        assert!(!h.can_go_back());
    }

    #[test]
    fn branch_discard() {
        let mut h = History::new();
        h.push_state(entry("gemini://a.example/"));
        h.push_state(entry("gemini://b.example/"));
        h.push_state(entry("gemini://c.example/"));
        h.go_back();
        h.go_back();
        assert_eq!(h.current_item().unwrap().url.host(), "a.example");
        h.push_state(entry("gemini://d.example/"));
        let hosts: Vec<_> = h.items().iter().map(|e| e.url.host().to_string()).collect();
        assert_eq!(hosts, ["a.example", "d.example"]);
        assert!(!h.can_go_forward());
        assert_eq!(h.current_item().unwrap().url.host(), "d.example");
    }

    #[test]
    fn empty_history_bounds() {
        let h = History::new();
        assert!(!h.can_go_back());
        assert!(!h.can_go_forward());
        assert!(h.current_item().is_none());
    }

    #[test]
    fn back_and_forward_move_one_step() {
        let mut h = History::new();
        h.push_state(entry("gemini://a.example/"));
        h.push_state(entry("gemini://b.example/"));
        h.go_back();
        assert_eq!(h.current_item().unwrap().url.host(), "a.example");
        h.go_back(); // already at the start, no-op
        assert_eq!(h.current_item().unwrap().url.host(), "a.example");
        h.go_forward();
        assert_eq!(h.current_item().unwrap().url.host(), "b.example");
        h.go_forward(); // already at the end, no-op
        assert_eq!(h.current_item().unwrap().url.host(), "b.example");
    }

    #[test]
    fn replace_state_in_place() {
        let mut h = History::new();
        h.push_state(entry("gemini://a.example/"));
        h.push_state(entry("gemini://b.example/"));
        h.go_back();
        h.replace_state(entry("gemini://r.example/"));
        assert_eq!(h.len(), 2);
        assert_eq!(h.current_item().unwrap().url.host(), "r.example");
        // Forward entry untouched.
        assert!(h.can_go_forward());
    }

    #[test]
    fn replace_state_on_empty_pushes() {
        let mut h = History::new();
        h.replace_state(entry("gemini://a.example/"));
        assert_eq!(h.len(), 1);
        assert_eq!(h.current_item().unwrap().url.host(), "a.example");
    }

    #[test]
    fn remove_clamps_cursor() {
        let mut h = History::new();
        let a = entry("gemini://a.example/");
        h.push_state(a.clone());
        h.push_state(entry("gemini://b.example/"));
        let b = h.current_item().unwrap().clone();
        h.remove(&b);
        assert_eq!(h.len(), 1);
        assert_eq!(h.current_item().unwrap().url.host(), "a.example");
        h.remove(&a);
        assert!(h.is_empty());
        assert!(h.current_item().is_none());
    }

    #[test]
    fn clear_resets() {
        let mut h = History::new();
        h.push_state(entry("gemini://a.example/"));
        h.clear();
        assert!(h.is_empty());
        assert!(!h.can_go_back());
        assert!(h.current_item().is_none());
    }
}
