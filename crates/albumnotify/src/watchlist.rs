//! Watchlist file: one artist per line, `<name>[ (band)][ # <artist-id>]`.
//!
//! Lines starting with `-` are disabled entries and skipped.

use std::path::Path;

use anyhow::{Context, Result};

use crate::html::unescape_html;

const PIN_SEPARATOR: &str = " # ";
const DISAMBIGUATION_SUFFIXES: [&str; 2] = [" (band)", " (группа)"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchlistEntry {
    pub name: String,
    pub pinned_id: Option<String>,
}

pub fn load(path: &Path) -> Result<Vec<WatchlistEntry>> {
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("read watchlist {:?}", path))?;
    Ok(parse(&raw))
}

pub fn parse(text: &str) -> Vec<WatchlistEntry> {
    text.lines().filter_map(parse_line).collect()
}

pub fn parse_line(line: &str) -> Option<WatchlistEntry> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('-') {
        return None;
    }

    let (raw_name, pinned_id) = match line.rsplit_once(PIN_SEPARATOR) {
        Some((name, id)) if is_artist_id(id) => (name, Some(id.to_string())),
        _ => (line, None),
    };

    let name = normalize_name(raw_name);
    if name.is_empty() {
        return None;
    }
    Some(WatchlistEntry { name, pinned_id })
}

fn is_artist_id(raw: &str) -> bool {
    !raw.is_empty()
        && raw
            .chars()
            .all(|c| c == '-' || c.is_ascii_digit() || ('a'..='f').contains(&c))
}

fn normalize_name(raw: &str) -> String {
    let mut name = raw.to_string();
    if name.contains('%') {
        if let Ok(decoded) = urlencoding::decode(&name) {
            name = decoded.into_owned();
        }
    }
    // Slashes break the search query on the catalog side, encoded ones included.
    let mut name = unescape_html(&name).replace('/', " ");
    for suffix in DISAMBIGUATION_SUFFIXES {
        name = name.replace(suffix, "");
    }
    name.trim().to_string()
}
