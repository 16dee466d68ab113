//! Output filename helpers
//!
//! Media files are written as `<sanitized-title>.<ext>`. Titles from IPTV
//! playlists carry accents, emoji and punctuation, so they are reduced to a
//! plain character set first.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Stem used when a title sanitizes to nothing
pub const FALLBACK_STEM: &str = "download";

/// Reduce `text` to plain ASCII.
///
/// Accented letters lose their marks (`é` → `e`), a few letters without a
/// decomposition are spelled out (`ß` → `ss`), and anything else outside
/// ASCII is dropped.
pub fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfkd() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        if is_combining_mark(c) {
            continue;
        }
        match c {
            'ß' => out.push_str("ss"),
            'æ' => out.push_str("ae"),
            'Æ' => out.push_str("AE"),
            'œ' => out.push_str("oe"),
            'Œ' => out.push_str("OE"),
            'ø' => out.push('o'),
            'Ø' => out.push('O'),
            'đ' => out.push('d'),
            'Đ' => out.push('D'),
            'ł' => out.push('l'),
            'Ł' => out.push('L'),
            'þ' => out.push_str("th"),
            'Þ' => out.push_str("TH"),
            _ => {}
        }
    }
    out
}

/// Turn a display title into a filesystem-safe file stem.
///
/// Keeps ASCII letters, digits, `-` and `_`; spaces become underscores.
pub fn sanitize_file_stem(title: &str) -> String {
    let plain = transliterate(title);
    let stem: String = plain
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();

    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

/// Extension of the last URL path segment, or `default` when there is none.
///
/// Only 1-5 ASCII alphanumerics count as an extension; the result is
/// lower-cased.
pub fn media_extension(url: &str, default: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()?
                .next_back()
                .and_then(|segment| segment.rsplit_once('.'))
                .map(|(_, ext)| ext.to_string())
        })
        .filter(|ext| (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| default.to_string())
}

/// Final filename for a task
pub fn output_file_name(title: &str, url: &str, default_ext: &str) -> String {
    format!(
        "{}.{}",
        sanitize_file_stem(title),
        media_extension(url, default_ext)
    )
}
