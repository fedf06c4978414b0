use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Title used when a playlist entry carries no usable name
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Category used when neither the vendor group nor the title yields one
pub const GENERAL_CATEGORY: &str = "General";

lazy_static! {
    /// Runs of non-word characters collapse into a single underscore in channel ids
    static ref NON_WORD_REGEX: Regex = Regex::new(r"\W+").unwrap();
}

/// Derive a channel id from its title: "Channel One" -> "channel_one"
///
/// Ids are not guaranteed unique: two channels sharing a title share an id.
pub fn derive_channel_id(title: &str) -> String {
    let lowered = title.to_lowercase();
    let id = NON_WORD_REGEX.replace_all(&lowered, "_").to_string();
    if id.is_empty() {
        // Only reachable with an empty title
        derive_channel_id(UNKNOWN_TITLE)
    } else {
        id
    }
}

/// Single channel (one stream URL) as persisted to the output file.
///
/// Write-only: previous output files are read back through `SnapshotEntry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    #[serde(rename = "m3u8")]
    pub stream_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub logo: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tvg_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tvg_chno: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cookies: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_agent: String,
}

impl ChannelRecord {
    /// Create a record with only the required fields set
    pub fn new(title: &str, category: &str, stream_url: &str) -> Self {
        Self {
            id: derive_channel_id(title),
            title: title.to_string(),
            category: category.to_string(),
            stream_url: stream_url.to_string(),
            logo: String::new(),
            tvg_id: String::new(),
            tvg_chno: String::new(),
            cookies: String::new(),
            user_agent: String::new(),
        }
    }

    pub fn cookies(&self) -> Option<&str> {
        non_blank(&self.cookies)
    }

    pub fn user_agent(&self) -> Option<&str> {
        non_blank(&self.user_agent)
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Loosely-typed entry read back from a previous output file.
///
/// Every field is optional so older or hand-edited snapshots still load;
/// `url` is the legacy name of `m3u8`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub m3u8: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub tvg_id: Option<String>,
    #[serde(default)]
    pub tvg_chno: Option<String>,
    #[serde(default)]
    pub cookies: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl SnapshotEntry {
    /// Re-normalize into a record. Returns None when no stream URL is present
    /// under either the current or the legacy field name.
    pub fn into_record(self) -> Option<ChannelRecord> {
        let stream_url = self
            .m3u8
            .filter(|u| !u.trim().is_empty())
            .or(self.url.filter(|u| !u.trim().is_empty()))?;

        let title = self
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let id = self
            .id
            .filter(|i| !i.trim().is_empty())
            .unwrap_or_else(|| derive_channel_id(&title));
        let category = self
            .category
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| GENERAL_CATEGORY.to_string());

        Some(ChannelRecord {
            id,
            title,
            category,
            stream_url,
            logo: self.logo.unwrap_or_default(),
            tvg_id: self.tvg_id.unwrap_or_default(),
            tvg_chno: self.tvg_chno.unwrap_or_default(),
            cookies: self.cookies.unwrap_or_default(),
            user_agent: self.user_agent.unwrap_or_default(),
        })
    }
}
