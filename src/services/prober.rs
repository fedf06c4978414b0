//! Stream liveness probing
//!
//! A channel is probed with an ordered list of strategies. Each strategy
//! reports `Reachable`, `Unreachable` or `Inconclusive`; the first conclusive
//! answer wins and a channel whose every probe is inconclusive is treated as
//! unreachable. Network errors never escape this module.

use lazy_static::lazy_static;
use regex::Regex;
use reqwest::header::{COOKIE, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

use crate::config::Config;
use crate::models::ChannelRecord;

/// User agent sent when the channel does not specify one
pub const DEFAULT_PROBE_USER_AGENT: &str = "Mozilla/5.0 (compatible; M3U-Merger/1.0)";

/// User agent sent when running under GitHub Actions and the channel does not specify one
pub const CI_PROBE_USER_AGENT: &str = "GitHub-Actions/1.0";

/// CDN edge-cache cookie that must be forwarded on its own
const EDGE_CACHE_COOKIE: &str = "Edge-Cache-Cookie";

lazy_static! {
    static ref EDGE_CACHE_COOKIE_REGEX: Regex = Regex::new(r"Edge-Cache-Cookie=([^;]+)").unwrap();
}

/// Result of a single probe strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Reachable,
    Unreachable,
    Inconclusive,
}

/// Probe strategies, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeStrategy {
    /// HEAD request, no body
    Existence,
    /// GET request reading the first body chunk
    Content,
}

const PROBE_ORDER: [ProbeStrategy; 2] = [ProbeStrategy::Existence, ProbeStrategy::Content];

/// Pick the default probe user agent for the current environment
pub fn resolve_default_user_agent(ci: bool, configured: &str) -> String {
    if ci {
        CI_PROBE_USER_AGENT.to_string()
    } else if configured.trim().is_empty() {
        DEFAULT_PROBE_USER_AGENT.to_string()
    } else {
        configured.to_string()
    }
}

/// Parse a cookie string into (name, value) pairs.
///
/// Strings carrying an `Edge-Cache-Cookie=` are reduced to that single cookie
/// (its value may itself contain `=`). Anything else is read as
/// `name=value; name=value`, where a repeated name keeps its first position
/// and its last value.
pub fn parse_cookies(cookies: &str) -> Vec<(String, String)> {
    let mut parsed: Vec<(String, String)> = Vec::new();

    if cookies.contains("Edge-Cache-Cookie=") {
        if let Some(value) = EDGE_CACHE_COOKIE_REGEX
            .captures(cookies)
            .and_then(|caps| caps.get(1))
        {
            parsed.push((EDGE_CACHE_COOKIE.to_string(), value.as_str().to_string()));
        }
        return parsed;
    }

    for pair in cookies.split(';') {
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        let name = name.trim().to_string();
        let value = value.trim().to_string();

        match parsed.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => parsed.push((name, value)),
        }
    }

    parsed
}

/// Render parsed cookies as a `Cookie` header value
fn cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Checks whether stream URLs currently serve content
pub struct LivenessProber {
    client: Client,
    default_user_agent: String,
    head_timeout: Duration,
    get_timeout: Duration,
}

impl LivenessProber {
    pub fn new(
        default_user_agent: &str,
        head_timeout_ms: u64,
        get_timeout_ms: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            default_user_agent: default_user_agent.to_string(),
            head_timeout: Duration::from_millis(head_timeout_ms),
            get_timeout: Duration::from_millis(get_timeout_ms),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let user_agent = resolve_default_user_agent(config.ci, &config.probe_user_agent);
        Self::new(&user_agent, config.head_timeout_ms, config.get_timeout_ms)
    }

    /// Probe a channel using its own cookies and user agent
    pub async fn probe_channel(&self, channel: &ChannelRecord) -> bool {
        self.probe(&channel.stream_url, channel.cookies(), channel.user_agent())
            .await
    }

    /// Return true if the URL responds successfully
    pub async fn probe(&self, url: &str, cookies: Option<&str>, user_agent: Option<&str>) -> bool {
        for strategy in PROBE_ORDER {
            match self.run_strategy(strategy, url, cookies, user_agent).await {
                ProbeOutcome::Reachable => return true,
                ProbeOutcome::Unreachable => return false,
                ProbeOutcome::Inconclusive => continue,
            }
        }
        false
    }

    async fn run_strategy(
        &self,
        strategy: ProbeStrategy,
        url: &str,
        cookies: Option<&str>,
        user_agent: Option<&str>,
    ) -> ProbeOutcome {
        match strategy {
            ProbeStrategy::Existence => {
                let request = self.client.head(url).timeout(self.head_timeout);
                self.existence_probe(self.decorate(request, cookies, user_agent), url)
                    .await
            }
            ProbeStrategy::Content => {
                let request = self.client.get(url).timeout(self.get_timeout);
                self.content_probe(self.decorate(request, cookies, user_agent), url)
                    .await
            }
        }
    }

    /// Attach user agent and cookie headers
    fn decorate(
        &self,
        request: RequestBuilder,
        cookies: Option<&str>,
        user_agent: Option<&str>,
    ) -> RequestBuilder {
        let user_agent = user_agent.unwrap_or(self.default_user_agent.as_str());
        let mut request = request.header(USER_AGENT, user_agent);

        if let Some(cookies) = cookies {
            let parsed = parse_cookies(cookies);
            if !parsed.is_empty() {
                request = request.header(COOKIE, cookie_header(&parsed));
            }
        }

        request
    }

    async fn existence_probe(&self, request: RequestBuilder, url: &str) -> ProbeOutcome {
        match request.send().await {
            Ok(resp) if resp.status().is_success() => ProbeOutcome::Reachable,
            Ok(resp) => {
                tracing::debug!("HEAD {} returned {}", url, resp.status().as_u16());
                ProbeOutcome::Inconclusive
            }
            Err(e) => {
                tracing::debug!("HEAD request failed for {}: {}", url, e);
                ProbeOutcome::Inconclusive
            }
        }
    }

    async fn content_probe(&self, request: RequestBuilder, url: &str) -> ProbeOutcome {
        let mut resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::debug!("GET request failed for {}: {}", url, e);
                return ProbeOutcome::Unreachable;
            }
        };

        if !resp.status().is_success() {
            tracing::debug!("GET {} returned {}", url, resp.status().as_u16());
            return ProbeOutcome::Unreachable;
        }

        // A success status is enough; the chunk read only confirms the body is readable
        if let Err(e) = resp.chunk().await {
            tracing::debug!("Content read failed for {}: {}", url, e);
        }
        ProbeOutcome::Reachable
    }
}
