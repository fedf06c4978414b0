use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::models::UNKNOWN_TITLE;

lazy_static! {
    /// Regex to parse EXTINF attributes (tvg-id="...", group-title="...", etc)
    static ref ATTR_REGEX: Regex = Regex::new(r#"(\w+(?:-\w+)*)="([^"]*)""#).unwrap();
}

/// Parsed EXTINF line data
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtinfData {
    pub attributes: HashMap<String, String>,
    /// Text after the last comma outside quotes, or "Unknown"
    pub title: String,
}

impl ExtinfData {
    /// Attribute value, ignoring blank values
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Parse an EXTINF line
/// Format: #EXTINF:duration tvg-id="..." tvg-name="..." tvg-logo="..." group-title="...",Title
///
/// Never fails: a line without attributes yields an empty map, a line without
/// a top-level comma yields the "Unknown" title.
pub fn parse_extinf(line: &str) -> ExtinfData {
    let mut attributes = HashMap::new();
    for caps in ATTR_REGEX.captures_iter(line) {
        let key = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        let value = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
        attributes.insert(key, value);
    }

    let title = last_top_level_comma(line)
        .map(|idx| line[idx + 1..].trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN_TITLE)
        .to_string();

    ExtinfData { attributes, title }
}

/// Byte index of the last comma not enclosed in double quotes
fn last_top_level_comma(line: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut last = None;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => last = Some(idx),
            _ => {}
        }
    }
    last
}
