//! M3U playlist parsing
//!
//! Turns `#EXTM3U` text into an ordered list of `(title, media URL)` pairs
//! plus per-title metadata. An entry looks like:
//!
//! ```text
//! #EXTINF:-1 xui-id="42" tvg-name="Movie A" tvg-logo="http://x/a.png" group-title="Drama",Movie
//! http://host/movie/user/pass/42.mp4
//! ```
//!
//! Attributes may appear in any order. Entries that fail to parse are
//! skipped; only a playlist with no usable entry at all is an error.

pub mod fetch;
pub mod filter;

pub use fetch::{FetchHandle, FetchPhase, PlaylistFetcher};
pub use filter::{EntryFilter, SortOrder};

use crate::error::{FormatErrorKind, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Marker every entry directive starts with
pub const ENTRY_MARKER: &str = "#EXTINF";

/// Duration value for streams and VOD assets without a fixed length
const INFINITE_DURATION: &str = "-1";

/// One selectable playlist item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Resolved display title
    pub title: String,
    pub media_url: String,
}

/// Attributes carried by an entry directive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// `xui-id` attribute
    pub external_id: Option<String>,
    /// `tvg-logo` attribute
    pub logo_url: Option<String>,
    /// `group-title` attribute
    pub group_title: Option<String>,
    pub media_url: String,
}

/// Result of parsing one playlist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Playlist {
    /// Entries in playlist order, unique by `(title, media_url)`
    pub entries: Vec<PlaylistEntry>,
    /// Metadata keyed by title
    pub metadata: HashMap<String, EntryMetadata>,
}

impl Playlist {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Metadata for a title
    pub fn get(&self, title: &str) -> Option<&EntryMetadata> {
        self.metadata.get(title)
    }

    /// Media URL of the first entry carrying `title`
    pub fn url_for(&self, title: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.title == title)
            .map(|e| e.media_url.as_str())
    }

    /// Sorted, deduplicated, non-empty group titles
    pub fn categories(&self) -> Vec<String> {
        self.metadata
            .values()
            .filter_map(|m| m.group_title.as_deref())
            .filter(|g| !g.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Why a single entry was skipped
#[derive(Debug, Error, PartialEq, Eq)]
enum EntryError {
    #[error("unterminated quote in attribute '{0}'")]
    UnterminatedQuote(String),
    #[error("missing ',' before the title")]
    MissingTitle,
    #[error("empty title")]
    EmptyTitle,
    #[error("no media URL after the directive")]
    MissingUrl,
}

/// Attributes and title of one directive line
#[derive(Debug, Default, PartialEq, Eq)]
struct Directive {
    external_id: Option<String>,
    display_name: Option<String>,
    logo_url: Option<String>,
    group_title: Option<String>,
    title: String,
}

/// Parse playlist text into entries and metadata
pub fn parse(content: &str) -> Result<Playlist> {
    if content.trim().is_empty() {
        return Err(FormatErrorKind::Empty.into());
    }

    if !content.contains(ENTRY_MARKER) {
        return Err(FormatErrorKind::InvalidFormat.into());
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut playlist = Playlist::default();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut skipped = 0usize;

    for (index, line) in lines.iter().enumerate() {
        let Some(rest) = line.trim_start().strip_prefix("#EXTINF:") else {
            continue;
        };

        let directive = match parse_directive(rest) {
            Ok(Some(directive)) => directive,
            // Fixed-duration entries are not VOD assets
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Skipping playlist entry at line {}: {}", index + 1, e);
                skipped += 1;
                continue;
            }
        };

        let media_url = match lines.get(index + 1).map(|l| l.trim()) {
            Some(url) if url.starts_with("http") => url.to_string(),
            _ => {
                tracing::warn!(
                    "Skipping playlist entry at line {}: {}",
                    index + 1,
                    EntryError::MissingUrl
                );
                skipped += 1;
                continue;
            }
        };

        let title = match directive.display_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => directive.title.clone(),
        };

        if !seen.insert((title.clone(), media_url.clone())) {
            continue;
        }

        playlist.metadata.insert(
            title.clone(),
            EntryMetadata {
                external_id: directive.external_id,
                logo_url: directive.logo_url,
                group_title: directive.group_title,
                media_url: media_url.clone(),
            },
        );
        playlist.entries.push(PlaylistEntry { title, media_url });
    }

    if playlist.entries.is_empty() {
        return Err(FormatErrorKind::NoEntriesFound.into());
    }

    tracing::debug!(
        "Parsed {} playlist entries ({} skipped)",
        playlist.entries.len(),
        skipped
    );
    Ok(playlist)
}

/// Parse what follows `#EXTINF:`.
///
/// Returns `Ok(None)` when the duration is not the infinite marker.
fn parse_directive(rest: &str) -> std::result::Result<Option<Directive>, EntryError> {
    let rest = rest.trim_start();
    let Some(after) = rest.strip_prefix(INFINITE_DURATION) else {
        return Ok(None);
    };
    // "-10" is a duration, not the marker
    if !after.is_empty() && !after.starts_with(|c: char| c.is_whitespace() || c == ',') {
        return Ok(None);
    }

    let mut directive = Directive::default();
    let mut input = after;

    loop {
        input = input.trim_start();
        if let Some(title) = input.strip_prefix(',') {
            let title = title.trim();
            if title.is_empty() && directive.display_name.as_deref().map_or(true, str::is_empty) {
                return Err(EntryError::EmptyTitle);
            }
            directive.title = title.to_string();
            return Ok(Some(directive));
        }
        if input.is_empty() {
            return Err(EntryError::MissingTitle);
        }

        let key_end = input
            .find(|c: char| c == '=' || c == ',' || c.is_whitespace())
            .unwrap_or(input.len());
        let key = &input[..key_end];
        input = &input[key_end..];

        let Some(value_part) = input.strip_prefix('=') else {
            // Bare token without a value
            continue;
        };

        let value = if let Some(quoted) = value_part.strip_prefix('"') {
            let end = quoted
                .find('"')
                .ok_or_else(|| EntryError::UnterminatedQuote(key.to_string()))?;
            input = &quoted[end + 1..];
            &quoted[..end]
        } else {
            let end = value_part
                .find(|c: char| c == ',' || c.is_whitespace())
                .unwrap_or(value_part.len());
            input = &value_part[end..];
            &value_part[..end]
        };

        let value = Some(value.to_string()).filter(|v| !v.is_empty());
        match key {
            "xui-id" => directive.external_id = value,
            "tvg-name" => directive.display_name = value,
            "tvg-logo" => directive.logo_url = value,
            "group-title" => directive.group_title = value,
            _ => {}
        }
    }
}
