use std::collections::HashSet;

use crate::models::ChannelRecord;

/// Merge channel lists into one list unique by stream URL.
///
/// Sources are processed in the order given; the first channel seen for a
/// (trimmed) URL wins and later duplicates are dropped without merging fields.
/// Channels with a blank URL are dropped. URLs are compared literally, so
/// `http://a/x` and `http://a/x/` are distinct.
pub fn merge_channels<I>(sources: I) -> Vec<ChannelRecord>
where
    I: IntoIterator<Item = Vec<ChannelRecord>>,
{
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();
    let mut duplicates_skipped = 0usize;
    let mut missing_url = 0usize;

    for source in sources {
        for channel in source {
            let key = channel.stream_url.trim();
            if key.is_empty() {
                missing_url += 1;
                continue;
            }

            if !seen_urls.insert(key.to_string()) {
                duplicates_skipped += 1;
                continue;
            }

            merged.push(channel);
        }
    }

    tracing::info!(
        unique = merged.len(),
        duplicates_skipped,
        missing_url,
        "Merged channel sources"
    );

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(title: &str, url: &str) -> ChannelRecord {
        ChannelRecord::new(title, "General", url)
    }

    #[test]
    fn test_first_seen_wins_across_sources() {
        let first = vec![channel("From First", "http://a.example/x.m3u8")];
        let second = vec![
            channel("From Second", "http://a.example/x.m3u8"),
            channel("Other", "http://a.example/y.m3u8"),
        ];

        let merged = merge_channels(vec![first.clone(), second]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], first[0]);
        assert_eq!(merged[1].title, "Other");
    }

    #[test]
    fn test_duplicates_within_one_source() {
        let source = vec![
            channel("A", "http://a.example/x.m3u8"),
            channel("B", " http://a.example/x.m3u8 "),
        ];
        let merged = merge_channels(vec![source]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "A");
    }

    #[test]
    fn test_blank_url_is_dropped() {
        let merged = merge_channels(vec![vec![channel("A", "  "), channel("B", "http://b")]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "B");
    }

    #[test]
    fn test_url_comparison_is_literal() {
        let merged = merge_channels(vec![vec![
            channel("A", "http://a.example/x"),
            channel("B", "http://a.example/x/"),
        ]]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let source = vec![
            channel("A", "http://a.example/1"),
            channel("B", "http://a.example/2"),
            channel("C", "http://a.example/1"),
        ];
        let once = merge_channels(vec![source]);
        let twice = merge_channels(vec![once.clone()]);

        assert_eq!(once, twice);
    }
}
