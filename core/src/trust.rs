/*
 * trust.rs
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

//! Per-host trust overrides: the set of hosts for which certificate
//! validation is skipped. Sessions and tabs only read membership; mutation
//! goes through `add`/`remove`, which persist immediately. On disk the set
//! is a JSON array of hostnames (the original kept the same array in its
//! preferences store).

use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

/// Hosts exempt from certificate validation.
#[derive(Debug, Default)]
pub struct TrustStore {
    hosts: BTreeSet<String>,
    path: Option<PathBuf>,
}

impl TrustStore {
    /// Store without persistence (tests, private windows).
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load from the given file. A missing or unreadable file is an empty
    /// store; the file appears on the first `add`.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let hosts = fs::read_to_string(&path)
            .ok()
            .and_then(|data| serde_json::from_str::<Vec<String>>(&data).ok())
            .map(|list| list.into_iter().collect())
            .unwrap_or_default();
        Self {
            hosts,
            path: Some(path),
        }
    }

    pub fn contains(&self, host: &str) -> bool {
        self.hosts.contains(host)
    }

    pub fn add(&mut self, host: impl Into<String>) {
        self.hosts.insert(host.into());
        self.save();
    }

    pub fn remove(&mut self, host: &str) {
        self.hosts.remove(host);
        self.save();
    }

    pub fn hosts(&self) -> impl Iterator<Item = &str> {
        self.hosts.iter().map(String::as_str)
    }

    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        let list: Vec<&str> = self.hosts.iter().map(String::as_str).collect();
        match serde_json::to_string(&list) {
            Ok(json) => {
                if let Some(parent) = path.parent() {
                    let _ = fs::create_dir_all(parent);
                }
                if let Err(e) = fs::write(path, json) {
                    eprintln!("[trust] failed to save {}: {}", path.display(), e);
                }
            }
            Err(e) => eprintln!("[trust] failed to encode: {}", e),
        }
    }
}

/// Default trust list path: ~/.lucciola/ignored_hosts.json.
pub fn default_trust_path() -> Option<PathBuf> {
    crate::config::default_config_dir().map(|d| d.join("ignored_hosts.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lucciola-trust-{}-{}.json", tag, std::process::id()))
    }

    #[test]
    fn membership() {
        let mut store = TrustStore::in_memory();
        assert!(!store.contains("a.example"));
        store.add("a.example");
        assert!(store.contains("a.example"));
        store.remove("a.example");
        assert!(!store.contains("a.example"));
    }

    #[test]
    fn save_and_reload() {
        let path = temp_path("roundtrip");
        let _ = fs::remove_file(&path);
        let mut store = TrustStore::load(&path);
        store.add("medusae.space");
        store.add("b.example");

        let reloaded = TrustStore::load(&path);
        assert!(reloaded.contains("medusae.space"));
        assert!(reloaded.contains("b.example"));
        assert_eq!(reloaded.hosts().count(), 2);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_or_corrupt_file_is_empty() {
        let missing = TrustStore::load(temp_path("missing"));
        assert_eq!(missing.hosts().count(), 0);

        let path = temp_path("corrupt");
        fs::write(&path, "not json at all").unwrap();
        let corrupt = TrustStore::load(&path);
        assert_eq!(corrupt.hosts().count(), 0);
        let _ = fs::remove_file(&path);
    }
}
