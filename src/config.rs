use std::env;
use std::path::PathBuf;

use crate::services::prober::DEFAULT_PROBE_USER_AGENT;

/// Playlist merged when PLAYLIST_SOURCES is not set
const DEFAULT_PLAYLIST_SOURCE: &str =
    "https://raw.githubusercontent.com/abusaeeidx/IPTV-Scraper-Zilla/refs/heads/main/CricHD.m3u";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Sources
    pub playlist_sources: Vec<String>,

    // Output
    pub output_file: PathBuf,
    pub merge_previous: bool,

    // Fetching
    pub fetch_timeout_ms: u64,
    pub max_m3u_size_mb: usize,
    pub user_agent: String,

    // Probing
    pub head_timeout_ms: u64,
    pub get_timeout_ms: u64,
    pub probe_user_agent: String,
    pub skip_probe: bool,

    // Environment
    pub ci: bool,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated source list, dropping blanks
pub fn parse_sources(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            // Sources
            playlist_sources: env::var("PLAYLIST_SOURCES")
                .map(|v| parse_sources(&v))
                .ok()
                .filter(|sources| !sources.is_empty())
                .unwrap_or_else(|| vec![DEFAULT_PLAYLIST_SOURCE.to_string()]),

            // Output
            output_file: env::var("OUTPUT_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("channels.json")),
            merge_previous: env::var("MERGE_PREVIOUS")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(true),

            // Fetching
            fetch_timeout_ms: env::var("FETCH_TIMEOUT_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()
                .unwrap_or(30_000), // 30 seconds

            max_m3u_size_mb: env::var("MAX_M3U_SIZE_MB")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),

            // Use VLC user agent to avoid IPTV server blocks
            user_agent: env::var("USER_AGENT")
                .unwrap_or_else(|_| "VLC/3.0.20 LibVLC/3.0.20".to_string()),

            // Probing
            head_timeout_ms: env::var("HEAD_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .unwrap_or(10_000), // 10 seconds

            get_timeout_ms: env::var("GET_TIMEOUT_MS")
                .unwrap_or_else(|_| "15000".to_string())
                .parse()
                .unwrap_or(15_000), // 15 seconds

            probe_user_agent: env::var("PROBE_USER_AGENT")
                .unwrap_or_else(|_| DEFAULT_PROBE_USER_AGENT.to_string()),

            skip_probe: env::var("SKIP_PROBE")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),

            // Environment
            ci: env::var("GITHUB_ACTIONS")
                .map(|v| !v.is_empty())
                .unwrap_or(false),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources() {
        assert_eq!(
            parse_sources(" http://a/1.m3u , ,http://b/2.m3u,"),
            vec!["http://a/1.m3u".to_string(), "http://b/2.m3u".to_string()]
        );
        assert!(parse_sources(" , ").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" no "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
