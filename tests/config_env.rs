use std::time::Duration;

use chainboard::FeedConfig;
use serial_test::serial;

const VARS: [&str; 5] = [
    "FORUM_BASE_URL",
    "DISPLAY_UTC_OFFSET_MINUTES",
    "PROBE_TIMEOUT_SECS",
    "BIND_ADDR",
    "SEED_DEMO_POSTS",
];

fn clear_env() {
    for var in VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_without_env() {
    clear_env();
    let cfg = FeedConfig::from_env();
    assert_eq!(cfg.forum_base_url, "https://forum.example");
    assert_eq!(cfg.display_offset.local_minus_utc(), 0);
    assert_eq!(cfg.probe_timeout, None);
    assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    assert!(!cfg.seed_demo_posts);
}

#[test]
#[serial]
fn env_overrides() {
    clear_env();
    std::env::set_var("FORUM_BASE_URL", "https://board.example.org/");
    std::env::set_var("DISPLAY_UTC_OFFSET_MINUTES", "-300");
    std::env::set_var("PROBE_TIMEOUT_SECS", "4");
    std::env::set_var("BIND_ADDR", "127.0.0.1:9000");
    std::env::set_var("SEED_DEMO_POSTS", "true");
    let cfg = FeedConfig::from_env();
    assert_eq!(cfg.forum_base_url, "https://board.example.org");
    assert_eq!(cfg.permalink("7"), "https://board.example.org/7");
    assert_eq!(cfg.display_offset.local_minus_utc(), -300 * 60);
    assert_eq!(cfg.probe_timeout, Some(Duration::from_secs(4)));
    assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
    assert!(cfg.seed_demo_posts);
    clear_env();
}

#[test]
#[serial]
fn invalid_values_fall_back() {
    clear_env();
    std::env::set_var("DISPLAY_UTC_OFFSET_MINUTES", "east");
    std::env::set_var("PROBE_TIMEOUT_SECS", "0");
    let cfg = FeedConfig::from_env();
    assert_eq!(cfg.display_offset.local_minus_utc(), 0);
    assert_eq!(cfg.probe_timeout, None);

    // beyond +-24h
    std::env::set_var("DISPLAY_UTC_OFFSET_MINUTES", "2000");
    assert_eq!(FeedConfig::from_env().display_offset.local_minus_utc(), 0);
    clear_env();
}
