use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use tracing::warn;

pub const DEFAULT_FORUM_BASE_URL: &str = "https://forum.example";

/// Runtime settings derived from env.
#[derive(Clone, Debug)]
pub struct FeedConfig {
    /// Permalinks are `<forum_base_url>/<id-or-tag>`; never ends with `/`.
    pub forum_base_url: String,
    /// Offset the date formatter renders wall-clock time in.
    pub display_offset: FixedOffset,
    /// `None` keeps probes unbounded.
    pub probe_timeout: Option<Duration>,
    pub bind_addr: String,
    pub seed_demo_posts: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            forum_base_url: DEFAULT_FORUM_BASE_URL.to_string(),
            display_offset: utc(),
            probe_timeout: None,
            bind_addr: "0.0.0.0:8080".to_string(),
            seed_demo_posts: false,
        }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

impl FeedConfig {
    pub fn from_env() -> Self {
        fn flag_env(name: &str) -> bool {
            std::env::var(name).map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
        }
        let defaults = Self::default();
        let forum_base_url = std::env::var("FORUM_BASE_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.forum_base_url);
        let display_offset = match std::env::var("DISPLAY_UTC_OFFSET_MINUTES") {
            Ok(raw) => raw
                .parse::<i32>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .and_then(FixedOffset::east_opt)
                .unwrap_or_else(|| {
                    warn!("ignoring invalid DISPLAY_UTC_OFFSET_MINUTES={raw:?}, using UTC");
                    utc()
                }),
            Err(_) => defaults.display_offset,
        };
        let probe_timeout = std::env::var("PROBE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Self {
            forum_base_url,
            display_offset,
            probe_timeout,
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            seed_demo_posts: flag_env("SEED_DEMO_POSTS"),
        }
    }

    pub fn permalink(&self, id_or_tag: &str) -> String {
        format!("{}/{}", self.forum_base_url, urlencoding::encode(id_or_tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permalinks_encode_tags() {
        let cfg = FeedConfig::default();
        assert_eq!(cfg.permalink("42"), "https://forum.example/42");
        assert_eq!(cfg.permalink("c++ tips"), "https://forum.example/c%2B%2B%20tips");
    }
}
