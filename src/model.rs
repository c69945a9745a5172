//! Reading list data model.
//!
//! A [`ReadingList`] is one complete snapshot: a mapping from page title to
//! [`ListEntry`]. It serializes as a JSON object keyed by title, which is both
//! the cache value and the response payload:
//!
//! ```json
//! {"Rust (programming language)": {"created": "2024-01-02T03:04:05Z", "extract": "Rust is ..."}}
//! ```
//!
//! Titles are kept in a sorted map so that serializing the same snapshot
//! always produces the same bytes.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

/// Metadata stored for one title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    /// Timestamp at which the entry was added to the list, as sent by the server.
    pub created: String,
    /// Short page summary; absent when the extract lookup found no match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<String>,
}

impl ListEntry {
    /// Creates an entry with no extract.
    #[must_use]
    pub fn new(created: impl Into<String>) -> Self {
        Self {
            created: created.into(),
            extract: None,
        }
    }
}

/// Title → entry snapshot.
///
/// Only the list fetcher and extract enricher mutate a list; the public API
/// is read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingList {
    entries: BTreeMap<String, ListEntry>,
}

impl ReadingList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from `(title, entry)` pairs; later duplicates win.
    pub fn from_entries<I, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (T, ListEntry)>,
        T: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(title, entry)| (title.into(), entry))
                .collect(),
        }
    }

    /// Inserts or replaces the entry for `title`.
    ///
    /// Returns `true` when a previous entry was replaced.
    pub(crate) fn insert(&mut self, title: String, entry: ListEntry) -> bool {
        self.entries.insert(title, entry).is_some()
    }

    /// Sets the extract of an existing entry.
    ///
    /// Returns `false`, leaving the list unchanged, when `title` is unknown.
    pub(crate) fn set_extract(&mut self, title: &str, extract: String) -> bool {
        match self.entries.get_mut(title) {
            Some(entry) => {
                entry.extract = Some(extract);
                true
            }
            None => false,
        }
    }

    /// Returns the entry for `title`.
    #[must_use]
    pub fn get(&self, title: &str) -> Option<&ListEntry> {
        self.entries.get(title)
    }

    /// Returns `true` when `title` is in the list.
    #[must_use]
    pub fn contains(&self, title: &str) -> bool {
        self.entries.contains_key(title)
    }

    /// Iterates over titles in sorted order.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates over `(title, entry)` pairs in title order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ListEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that carry an extract.
    #[must_use]
    pub fn extract_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.extract.is_some())
            .count()
    }
}

impl<'a> IntoIterator for &'a ReadingList {
    type Item = (&'a String, &'a ListEntry);
    type IntoIter = btree_map::Iter<'a, String, ListEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
