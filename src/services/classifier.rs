use lazy_static::lazy_static;
use regex::Regex;

use crate::models::GENERAL_CATEGORY;

lazy_static! {
    /// Vendor prefix such as "Fancode-" or "TOFFEE-" (everything up to the first hyphen)
    static ref VENDOR_PREFIX: Regex = Regex::new(r"(?i)^[^-]*-").unwrap();
}

/// Categories that are accepted as-is (capitalized) when they match exactly
const SIMPLE_CATEGORIES: &[&str] = &[
    "cricket",
    "football",
    "soccer",
    "basketball",
    "baseball",
    "hockey",
    "news",
    "movies",
    "kids",
    "music",
];

/// Keyword containment rules, checked in order. First match wins, so a text
/// containing both "news" and "movie" resolves to News.
const KEYWORD_RULES: &[(&[&str], &str)] = &[
    (&["cricket"], "Cricket"),
    (&["football", "soccer"], "Football"),
    (&["basketball", "nba"], "Basketball"),
    (&["baseball", "mlb"], "Baseball"),
    (&["hockey", "nhl"], "Hockey"),
    (&["news", "cnn", "bbc", "fox news"], "News"),
    (&["movie", "cinema", "film", "hbo"], "Movies"),
];

/// Maps vendor group titles (or channel titles) onto canonical categories
pub struct CategoryClassifier;

impl CategoryClassifier {
    /// Main classification method. Uses the vendor group when present,
    /// otherwise infers from the title. Never returns an empty string.
    pub fn classify(group: Option<&str>, title: &str) -> String {
        if let Some(group) = group.filter(|g| !g.trim().is_empty()) {
            if let Some(category) = Self::classify_by_group(group) {
                return category;
            }
        }

        Self::classify_by_title(title)
    }

    /// Classify based on the vendor group title.
    /// Returns None only when the group cleans down to nothing.
    pub fn classify_by_group(group: &str) -> Option<String> {
        let cleaned = Self::clean_group(group);
        if cleaned.is_empty() {
            return None;
        }

        let lower = cleaned.to_lowercase();
        if SIMPLE_CATEGORIES.contains(&lower.as_str()) {
            return Some(capitalize(&lower));
        }

        if let Some(category) = Self::match_keywords(&lower) {
            return Some(category.to_string());
        }

        // Unrecognized vendor category passes through
        Some(cleaned)
    }

    /// Classify based on title keywords, defaulting to "General"
    pub fn classify_by_title(title: &str) -> String {
        Self::match_keywords(&title.to_lowercase())
            .unwrap_or(GENERAL_CATEGORY)
            .to_string()
    }

    /// Strip a vendor prefix ("Fancode-Cricket" -> "Cricket") and keep only the
    /// last segment of a semicolon list ("Sports; Cricket" -> "Cricket")
    pub fn clean_group(group: &str) -> String {
        let without_prefix = VENDOR_PREFIX.replace(group.trim(), "");
        let last_segment = match without_prefix.rfind(';') {
            Some(idx) => &without_prefix[idx + 1..],
            None => &*without_prefix,
        };
        last_segment.trim().to_string()
    }

    fn match_keywords(lower: &str) -> Option<&'static str> {
        KEYWORD_RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
            .map(|(_, category)| *category)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
