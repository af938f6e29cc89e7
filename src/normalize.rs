//! Text normalization shared by the source clients and the drivers.
//!
//! Query strings sent to the metadata API, scraped counter text, and short
//! log labels all go through here.

use unicode_normalization::UnicodeNormalization;

// ============================================================================
// QUERY BUILDING
// ============================================================================

/// Track name with any parenthesized suffix dropped:
/// "Song (feat. X)" -> "Song", "Song (2011 Remaster)" -> "Song".
///
/// Only the first `" ("` counts, matching how the catalog decorates names.
pub fn clean_track_name(name: &str) -> &str {
    name.split(" (").next().unwrap_or(name).trim()
}

/// Search query for the metadata API: "{artist} {clean track name}".
pub fn build_query(artist_name: &str, track_name: &str) -> String {
    let artist = artist_name.trim();
    let track = clean_track_name(track_name);
    match (artist.is_empty(), track.is_empty()) {
        (true, _) => track.to_string(),
        (_, true) => artist.to_string(),
        _ => format!("{} {}", artist, track),
    }
}

// ============================================================================
// SCRAPED NUMBERS
// ============================================================================

/// Parse a scraped counter like "1 234 567" (often with non-breaking or
/// narrow spaces as group separators).
///
/// NFKC folds U+00A0 and friends into plain spaces; all whitespace is then
/// dropped. Anything that is not plain ASCII digits afterwards is rejected.
pub fn parse_count_text(raw: &str) -> Option<u64> {
    let digits: String = raw.nfkc().filter(|c| !c.is_whitespace()).collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

// ============================================================================
// LOG LABELS
// ============================================================================

/// First `max_chars` characters of `s`, with "..." when truncated.
/// Char-based so multi-byte names never split mid-codepoint.
pub fn abbreviate(s: &str, max_chars: usize) -> String {
    let mut chars = s.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
