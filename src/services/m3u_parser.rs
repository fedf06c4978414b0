use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::models::ChannelRecord;
use crate::services::classifier::CategoryClassifier;
use crate::services::extinf::{parse_extinf, ExtinfData};

const EXTINF_PREFIX: &str = "#EXTINF";
const VLCOPT_PREFIX: &str = "#EXTVLCOPT";
const EXTHTTP_PREFIX: &str = "#EXTHTTP:";
const USER_AGENT_KEY: &str = "http-user-agent=";

/// Errors raised while fetching a playlist source
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid playlist URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{0}")]
    Status(String),

    #[error("Playlist too large: {size_mb:.1}MB (limit {limit_mb}MB)")]
    TooLarge { size_mb: f64, limit_mb: usize },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Per-channel network options gathered from #EXTVLCOPT / #EXTHTTP lines
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ChannelOptions {
    user_agent: Option<String>,
    cookies: Option<String>,
}

/// Parser state: either waiting for a header, or holding one channel in progress
#[derive(Debug)]
enum ParseState {
    Idle,
    Accumulating {
        record: ChannelRecord,
        options: ChannelOptions,
    },
}

/// Build a channel (without stream URL) from an EXTINF header
fn channel_from_extinf(extinf: &ExtinfData) -> ChannelRecord {
    let title = extinf
        .attr("tvg-name")
        .unwrap_or(extinf.title.as_str())
        .to_string();
    let category = CategoryClassifier::classify(extinf.attr("group-title"), &title);

    let mut record = ChannelRecord::new(&title, &category, "");
    record.logo = extinf.attr("tvg-logo").unwrap_or_default().to_string();
    record.tvg_id = extinf.attr("tvg-id").unwrap_or_default().to_string();
    record.tvg_chno = extinf.attr("tvg-chno").unwrap_or_default().to_string();
    record
}

/// Extract the user agent from `#EXTVLCOPT:http-user-agent=<percent-encoded>`
fn parse_user_agent_option(line: &str) -> Option<String> {
    let idx = line.find(USER_AGENT_KEY)?;
    let token = line[idx + USER_AGENT_KEY.len()..].trim();
    if token.is_empty() {
        return None;
    }

    let decoded = urlencoding::decode(token)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| token.to_string());
    Some(decoded)
}

/// Extract the cookie from `#EXTHTTP:{"cookie":"..."}`. Malformed JSON is ignored.
fn parse_http_option(line: &str) -> Option<String> {
    let json = line.strip_prefix(EXTHTTP_PREFIX)?.trim();
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    value
        .get("cookie")
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .map(|c| c.to_string())
}

/// Parse a full playlist document into channels, in the order their stream
/// URLs appear.
///
/// A header not followed by a URL line (e.g. directly followed by another
/// header) never produces a channel.
pub fn parse_playlist(content: &str) -> Vec<ChannelRecord> {
    let mut channels = Vec::new();
    let mut state = ParseState::Idle;

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(EXTINF_PREFIX) {
            let extinf = parse_extinf(line);
            state = ParseState::Accumulating {
                record: channel_from_extinf(&extinf),
                options: ChannelOptions::default(),
            };
            continue;
        }

        if line.starts_with(VLCOPT_PREFIX) {
            if let ParseState::Accumulating { options, .. } = &mut state {
                if let Some(user_agent) = parse_user_agent_option(line) {
                    options.user_agent = Some(user_agent);
                }
            }
            continue;
        }

        if line.starts_with(EXTHTTP_PREFIX) {
            if let ParseState::Accumulating { options, .. } = &mut state {
                if let Some(cookies) = parse_http_option(line) {
                    options.cookies = Some(cookies);
                }
            }
            continue;
        }

        if line.starts_with("http") {
            if let ParseState::Accumulating {
                mut record,
                options,
            } = std::mem::replace(&mut state, ParseState::Idle)
            {
                record.stream_url = line.to_string();
                if let Some(user_agent) = options.user_agent {
                    record.user_agent = user_agent;
                }
                if let Some(cookies) = options.cookies {
                    record.cookies = cookies;
                }
                channels.push(record);
            }
        }
    }

    channels
}

/// Validate URL is HTTP/HTTPS
fn validate_source_url(url: &str) -> Result<(), FetchError> {
    let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// M3U playlist fetcher + parser
pub struct M3UParser {
    client: Client,
    max_m3u_size_mb: usize,
}

impl M3UParser {
    /// Create a new M3U parser
    pub fn new(user_agent: &str, timeout_ms: u64, max_m3u_size_mb: usize) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_millis(timeout_ms))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            max_m3u_size_mb,
        })
    }

    /// Fetch the raw playlist text. Single attempt, no retries.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        validate_source_url(url)?;

        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let friendly = match status {
                reqwest::StatusCode::NOT_FOUND => "Playlist not found (404). Check the URL.".to_string(),
                reqwest::StatusCode::FORBIDDEN => "Access denied (403). The playlist may require authentication.".to_string(),
                reqwest::StatusCode::TOO_MANY_REQUESTS => "Too many requests (429). The playlist server is rate limiting.".to_string(),
                _ => {
                    let reason = status
                        .canonical_reason()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Error".to_string());
                    format!("HTTP {}: {}", status.as_u16(), reason)
                }
            };
            return Err(FetchError::Status(friendly));
        }

        if let Some(len) = resp.content_length() {
            let max_bytes = (self.max_m3u_size_mb as u64) * 1024 * 1024;
            if len > max_bytes {
                return Err(FetchError::TooLarge {
                    size_mb: len as f64 / 1024f64 / 1024f64,
                    limit_mb: self.max_m3u_size_mb,
                });
            }
        }

        Ok(resp.text().await?)
    }

    /// Fetch a playlist and parse it into channels
    pub async fn fetch_and_parse(&self, url: &str) -> Result<Vec<ChannelRecord>, FetchError> {
        tracing::info!("Fetching playlist: {}", url);
        let content = self.fetch(url).await?;
        tracing::debug!("Playlist size: {:.2} KB", content.len() as f64 / 1024.0);

        let channels = parse_playlist(&content);
        tracing::info!("Parsed {} channels from {}", channels.len(), url);
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_demo_playlist() {
        let content = "#EXTINF:-1 tvg-name=\"Demo Sports\" group-title=\"Fancode-Cricket\",Demo\nhttp://example.com/demo.m3u8\n";
        let channels = parse_playlist(content);

        assert_eq!(channels.len(), 1);
        let channel = &channels[0];
        assert_eq!(channel.id, "demo_sports");
        assert_eq!(channel.title, "Demo Sports");
        assert_eq!(channel.category, "Cricket");
        assert_eq!(channel.stream_url, "http://example.com/demo.m3u8");
    }

    #[test]
    fn test_parse_minimal_header() {
        let channels = parse_playlist("#EXTM3U\n#EXTINF:-1,Channel One\nhttp://a.example/one.m3u8");

        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].id, "channel_one");
        assert_eq!(channels[0].title, "Channel One");
        assert_eq!(channels[0].category, "General");
        assert!(channels[0].logo.is_empty());
    }

    #[test]
    fn test_header_without_url_is_dropped() {
        let content = "#EXTINF:-1,Orphan\n#EXTINF:-1,Kept\nhttp://a.example/kept.m3u8\n#EXTINF:-1,Trailing\n";
        let channels = parse_playlist(content);

        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].title, "Kept");
    }

    #[test]
    fn test_url_without_header_is_ignored() {
        let channels = parse_playlist("#EXTM3U\nhttp://a.example/stray.m3u8\n");
        assert!(channels.is_empty());
    }

    #[test]
    fn test_metadata_pass_through() {
        let content = r#"#EXTINF:-1 tvg-id="sky.uk" tvg-chno="101" tvg-logo="http://logo/sky.png" group-title="Entertainment",Sky One
http://a.example/sky.m3u8"#;
        let channel = &parse_playlist(content)[0];

        assert_eq!(channel.tvg_id, "sky.uk");
        assert_eq!(channel.tvg_chno, "101");
        assert_eq!(channel.logo, "http://logo/sky.png");
        assert_eq!(channel.category, "Entertainment");
    }

    #[test]
    fn test_option_lines() {
        let content = r#"#EXTINF:-1 group-title="TOFFEE-News",Somoy TV
#EXTVLCOPT:http-user-agent=Toffee%20%28Linux%3BAndroid%2014%29
#EXTHTTP:{"cookie":"Edge-Cache-Cookie=URLPrefix=aHR0cHM6; Path=/"}
https://toffee.example/somoy/playlist.m3u8"#;
        let channel = &parse_playlist(content)[0];

        assert_eq!(channel.user_agent, "Toffee (Linux;Android 14)");
        assert_eq!(channel.cookies, "Edge-Cache-Cookie=URLPrefix=aHR0cHM6; Path=/");
        assert_eq!(channel.category, "News");
    }

    #[test]
    fn test_malformed_exthttp_is_ignored() {
        let content = "#EXTINF:-1,X\n#EXTHTTP:{not json\nhttp://a.example/x.m3u8";
        let channel = &parse_playlist(content)[0];
        assert!(channel.cookies.is_empty());
    }

    #[test]
    fn test_options_do_not_leak_to_next_channel() {
        let content = "#EXTINF:-1,A\n#EXTVLCOPT:http-user-agent=AgentA\nhttp://a.example/a.m3u8\n#EXTINF:-1,B\nhttp://a.example/b.m3u8";
        let channels = parse_playlist(content);

        assert_eq!(channels[0].user_agent, "AgentA");
        assert!(channels[1].user_agent.is_empty());
    }

    #[test]
    fn test_options_reset_by_new_header() {
        let content = "#EXTINF:-1,A\n#EXTVLCOPT:http-user-agent=AgentA\n#EXTINF:-1,B\nhttp://a.example/b.m3u8";
        let channels = parse_playlist(content);

        assert_eq!(channels.len(), 1);
        assert!(channels[0].user_agent.is_empty());
    }

    #[test]
    fn test_validate_source_url() {
        assert!(validate_source_url("https://example.com/list.m3u").is_ok());
        assert!(validate_source_url("ftp://example.com/list.m3u").is_err());
        assert!(validate_source_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_fetch_and_parse() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.m3u"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("#EXTM3U\n#EXTINF:-1,News 24\nhttp://a.example/news.m3u8\n"),
            )
            .mount(&server)
            .await;

        let parser = M3UParser::new("test-agent", 5_000, 10).unwrap();
        let channels = parser
            .fetch_and_parse(&format!("{}/list.m3u", server.uri()))
            .await
            .unwrap();

        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].category, "News");
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let parser = M3UParser::new("test-agent", 5_000, 10).unwrap();
        let err = parser
            .fetch(&format!("{}/missing.m3u", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Status(_)));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_fetch_status_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/private.m3u"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/busy.m3u"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let parser = M3UParser::new("test-agent", 5_000, 10).unwrap();

        let forbidden = parser
            .fetch(&format!("{}/private.m3u", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(
            forbidden.to_string(),
            "Access denied (403). The playlist may require authentication."
        );

        let limited = parser
            .fetch(&format!("{}/busy.m3u", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(
            limited.to_string(),
            "Too many requests (429). The playlist server is rate limiting."
        );
    }

    #[tokio::test]
    async fn test_fetch_rejects_oversized_playlist() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge.m3u"))
            .respond_with(ResponseTemplate::new(200).set_body_string("#".repeat(2 * 1024 * 1024)))
            .mount(&server)
            .await;

        let parser = M3UParser::new("test-agent", 5_000, 1).unwrap();
        let err = parser
            .fetch(&format!("{}/huge.m3u", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::TooLarge { limit_mb: 1, .. }));
        assert_eq!(err.to_string(), "Playlist too large: 2.0MB (limit 1MB)");
    }
}
