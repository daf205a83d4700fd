use once_cell::sync::Lazy;
use regex::Regex;

// scheme? (domain with >= 2 letter TLD | dotted quad) port? path* query? fragment?
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?i)^(https?://)?",
        r"((([a-z0-9]([a-z0-9-]*[a-z0-9])*)\.)+[a-z]{2,}|",
        r"(([0-9]{1,3}\.){3}[0-9]{1,3}))",
        r"(:[0-9]+)?",
        r"(/[-a-z0-9%_.~+]*)*",
        r"(\?[;&a-z0-9%_.~+=-]*)?",
        r"(#[-a-z0-9_]*)?$",
    ))
    .expect("URL pattern is a valid regex")
});

/// Best-effort check for whether `candidate` looks like a link.
///
/// This is a heuristic, not RFC 3986 validation: internationalized domains
/// and other exotic shapes are rejected, and the dotted-quad branch does not
/// range-check octets.
pub fn is_url(candidate: &str) -> bool {
    URL_PATTERN.is_match(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_ascii_only() {
        assert!(!is_url("example.com:\u{668}\u{660}"));
        assert!(!is_url("\u{661}\u{662}\u{663}.1.1.1"));
        assert!(is_url("example.com:80"));
    }

    #[test]
    fn accepts_bare_domains_and_ips() {
        assert!(is_url("example.com"));
        assert!(is_url("192.168.0.1:8080/path?q=1"));
        assert!(is_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=RDMME8LIxsJLkbc"));
        assert!(is_url("HTTP://Example.ORG/Some/Path#frag"));
        assert!(is_url("https://youtu.be/abc-123?si=tKTSlEDYEMHlbhLc"));
    }

    #[test]
    fn rejects_prose_and_malformed_input() {
        assert!(!is_url("not a url at all"));
        assert!(!is_url(""));
        assert!(!is_url("localhost"));
        assert!(!is_url("example.c"));
        assert!(!is_url("ftp://example.com"));
        assert!(!is_url("example.com/has space"));
        assert!(!is_url("https://"));
    }
}
