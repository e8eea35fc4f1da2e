//! Tag and key normalization
//!
//! Turns raw field values into canonical tag lists. Every function here is
//! total: junk input yields an empty list or `None`, never an error.

use crate::graph::TagId;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashSet;

/// Delimiters recognised between tags in a single field
pub const DEFAULT_DELIMITERS: &[char] = &['|', ',', ';'];

/// Placeholder values that mean "no tags"
const SENTINELS: &[&str] = &["nan", "none", "null", "na", "<na>", "n/a"];

/// Placeholder artist names that would otherwise become hub nodes
const SKIP_ENTITIES: &[&str] = &[
    "various",
    "various artists",
    "various artist",
    "unknown",
    "unknown artist",
    "unknown artists",
];

const PRETTY_SUBS: &[(&str, &str)] = &[
    ("Idm", "IDM"),
    ("Edm", "EDM"),
    ("Dnb", "DnB"),
    ("Uk ", "UK "),
    ("Dj ", "DJ "),
];

/// Tag splitting options
#[derive(Debug, Clone)]
pub struct TagSplitter {
    pub delimiters: Vec<char>,
    pub dedupe: bool,
    pub lowercase: bool,
}

impl Default for TagSplitter {
    fn default() -> Self {
        Self {
            delimiters: DEFAULT_DELIMITERS.to_vec(),
            dedupe: true,
            lowercase: true,
        }
    }
}

impl TagSplitter {
    /// Split a raw field into normalized tags
    ///
    /// Handles sentinel values, `[]`, JSON array literals and multiple
    /// delimiters. Whitespace inside a tag is collapsed to single spaces.
    pub fn split(&self, raw: &str) -> Vec<TagId> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "[]" {
            return Vec::new();
        }
        if SENTINELS.contains(&raw.to_lowercase().as_str()) {
            return Vec::new();
        }

        let fields = json_array_items(raw).unwrap_or_else(|| vec![raw.to_string()]);
        let tokens = fields
            .iter()
            .flat_map(|field| field.split(|c: char| self.delimiters.contains(&c)));

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for token in tokens {
            let collapsed = token.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.is_empty() {
                continue;
            }
            let tag = if self.lowercase {
                collapsed.to_lowercase()
            } else {
                collapsed
            };
            if self.dedupe && !seen.insert(tag.clone()) {
                continue;
            }
            out.push(tag);
        }
        out
    }
}

/// Parse `["rock", "pop"]` style fields; `None` if `raw` is not a JSON array
fn json_array_items(raw: &str) -> Option<Vec<String>> {
    if !(raw.starts_with('[') && raw.ends_with(']')) {
        return None;
    }
    let values: Vec<serde_json::Value> = serde_json::from_str(raw).ok()?;
    Some(
        values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .filter(|s| !s.trim().is_empty())
            .collect(),
    )
}

/// Normalize a raw field with the default splitter
pub fn normalize(raw: &str) -> Vec<TagId> {
    TagSplitter::default().split(raw)
}

/// Normalize an optional field; absent values have no tags
pub fn normalize_opt(raw: Option<&str>) -> Vec<TagId> {
    raw.map(normalize).unwrap_or_default()
}

/// True for placeholder names such as "Various Artists"
pub fn is_skip_entity(name: &str) -> bool {
    let lowered = name.trim().to_lowercase();
    SKIP_ENTITIES.contains(&lowered.as_str())
}

/// Convert a normalized tag to a display label ("idm" -> "IDM")
pub fn pretty_label(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    let mut prev_cased = false;
    for ch in tag.chars() {
        if prev_cased {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        prev_cased = ch.is_alphabetic();
    }
    for (from, to) in PRETTY_SUBS {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out
}

fn plausible_year(y: i32) -> Option<i32> {
    (1800..=2100).contains(&y).then_some(y)
}

/// Extract a release year from free-form text
///
/// Tries the whole value, then its first four characters, then the first
/// four digits found anywhere. Years outside 1800..=2100 are rejected.
pub fn coerce_year(raw: &str) -> Option<i32> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        if let Some(year) = s.parse().ok().and_then(plausible_year) {
            return Some(year);
        }
    }
    let head: String = s.chars().take(4).collect();
    if head.len() == 4 && head.chars().all(|c| c.is_ascii_digit()) {
        if let Some(year) = head.parse().ok().and_then(plausible_year) {
            return Some(year);
        }
    }
    let digits: String = s.chars().filter(char::is_ascii_digit).take(4).collect();
    if digits.len() == 4 {
        return digits.parse().ok().and_then(plausible_year);
    }
    None
}

/// Parse a timestamp into epoch milliseconds
///
/// Accepts integer epoch-ms values, RFC 3339 strings, `YYYY-MM-DD HH:MM:SS`
/// (read as UTC) and bare `YYYY-MM-DD` dates. Anything else is `None`.
pub fn parse_timestamp_ms(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(ms) = s.parse::<i64>() {
        return Some(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp_millis());
    }
    None
}
