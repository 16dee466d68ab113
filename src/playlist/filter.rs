//! Catalog filtering
//!
//! Search, category and sort-order selection over a parsed playlist.

use super::{Playlist, PlaylistEntry};
use crate::filename::transliterate;
use serde::{Deserialize, Serialize};

/// Ordering of filtered results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Keep playlist order
    #[default]
    Playlist,
    /// Title A-Z
    NameAscending,
    /// Title Z-A
    NameDescending,
}

/// Selection criteria for playlist entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Whitespace-separated search terms; every term must match
    pub query: String,
    /// Exact group title to keep (None = all categories)
    pub category: Option<String>,
    pub sort: SortOrder,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the search query
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// Restrict to one category
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the sort order
    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    /// Entries of `playlist` that match, in the requested order
    pub fn apply<'a>(&self, playlist: &'a Playlist) -> Vec<&'a PlaylistEntry> {
        let tokens: Vec<String> = self
            .query
            .split_whitespace()
            .map(normalize)
            .filter(|t| !t.is_empty())
            .collect();

        let mut matched: Vec<&PlaylistEntry> = playlist
            .entries
            .iter()
            .filter(|entry| match self.category {
                Some(ref category) => playlist
                    .get(&entry.title)
                    .and_then(|m| m.group_title.as_deref())
                    == Some(category.as_str()),
                None => true,
            })
            .filter(|entry| {
                if tokens.is_empty() {
                    return true;
                }
                let title = normalize(&entry.title);
                tokens.iter().all(|t| title.contains(t.as_str()))
            })
            .collect();

        match self.sort {
            SortOrder::Playlist => {}
            SortOrder::NameAscending => matched.sort_by(|a, b| a.title.cmp(&b.title)),
            SortOrder::NameDescending => matched.sort_by(|a, b| b.title.cmp(&a.title)),
        }

        matched
    }
}

fn normalize(text: &str) -> String {
    transliterate(&text.to_lowercase())
}
