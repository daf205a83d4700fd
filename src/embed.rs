//! Embed synthesis: turn a link plus its probed type into markup.
//!
//! Branch order is fixed and the first match wins:
//! probed `image/*`, probed `video/*`, probed exactly `text/html`, then the
//! string heuristics (image suffix, short video link, watch link, `live`,
//! sandboxed fallback).

use serde::Serialize;

use crate::markup::{escape_attr, Markup};
use crate::probe::{ContentProbe, ProbedType};

pub const POST_CONTENT_CLASS: &str = "post-content";
pub const TAG_CONTENT_CLASS: &str = "tag-content";

const IMAGE_SUFFIXES: [&str; 4] = [".gif", ".png", ".jpg", ".jpeg"];
const SHORT_LINK_MARKER: &str = ".be/";
const SHORT_LINK_REWRITE: &str = "be.com/embed/";
const WATCH_MARKER: &str = "watch?v=";
const WATCH_REWRITE: &str = "embed/";
/// Fixed tracking tokens stripped from watch links. Not a query parser.
const WATCH_TRACKING_TOKENS: [&str; 3] = ["&start_radio=1", "&list=RDMME8LIxsJLkbc", "?si=tKTSlEDYEMHlbhLc"];
// Blind substring: any "live" anywhere in the link is rewritten.
const LIVE_MARKER: &str = "live";
const LIVE_REWRITE: &str = "embed";
const FALLBACK_SANDBOX: &str = "allow-scripts allow-forms allow-same-origin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    ImageSuffix,
    ShortVideoLink,
    WatchLink,
    LiveLink,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifiedContent {
    Text,
    Image,
    Video,
    Webpage,
    UnknownHeuristic(HeuristicKind),
}

/// Classify a link. Any probe result other than `image/*`, `video/*` or
/// exactly `text/html` (including `Unknown`) falls through to the heuristics.
pub fn classify_content(url: &str, probed: &ProbedType) -> ClassifiedContent {
    if let ProbedType::Known(mime) = probed {
        if mime.starts_with("image/") {
            return ClassifiedContent::Image;
        }
        if mime.starts_with("video/") {
            return ClassifiedContent::Video;
        }
        if mime == "text/html" {
            return ClassifiedContent::Webpage;
        }
    }
    let kind = if IMAGE_SUFFIXES.iter().any(|s| url.ends_with(s)) {
        HeuristicKind::ImageSuffix
    } else if url.contains(SHORT_LINK_MARKER) {
        HeuristicKind::ShortVideoLink
    } else if url.contains(WATCH_MARKER) {
        HeuristicKind::WatchLink
    } else if url.contains(LIVE_MARKER) {
        HeuristicKind::LiveLink
    } else {
        HeuristicKind::Fallback
    };
    ClassifiedContent::UnknownHeuristic(kind)
}

/// Force `https://`, dropping any `https://` or `http://` the caller gave.
pub fn normalize_scheme(url: &str) -> String {
    let rest = strip_prefix_ignore_case(url, "https://")
        .or_else(|| strip_prefix_ignore_case(url, "http://"))
        .unwrap_or(url);
    format!("https://{rest}")
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

/// The source URL an iframe branch points at, after its rewrite.
pub fn embed_source(url: &str, kind: HeuristicKind) -> String {
    match kind {
        HeuristicKind::ImageSuffix => url.to_string(),
        HeuristicKind::ShortVideoLink => normalize_scheme(&url.replacen(SHORT_LINK_MARKER, SHORT_LINK_REWRITE, 1)),
        HeuristicKind::WatchLink => {
            let mut src = normalize_scheme(&url.replacen(WATCH_MARKER, WATCH_REWRITE, 1));
            for token in WATCH_TRACKING_TOKENS {
                src = src.replacen(token, "", 1);
            }
            src
        }
        HeuristicKind::LiveLink => normalize_scheme(&url.replacen(LIVE_MARKER, LIVE_REWRITE, 1)),
        HeuristicKind::Fallback => normalize_scheme(url),
    }
}

fn image(src: &str, class: &str) -> Markup {
    Markup::trusted(format!(
        r#"<div class="{}"><img src="{}" alt="Post image"/></div>"#,
        escape_attr(class),
        escape_attr(src)
    ))
}

fn video(src: &str, class: &str) -> Markup {
    Markup::trusted(format!(
        r#"<div class="{}"><video controls src="{}">Your browser does not support the video tag.</video></div>"#,
        escape_attr(class),
        escape_attr(src)
    ))
}

fn frame(src: &str, class: &str, sandbox: Option<&str>) -> Markup {
    let sandbox = sandbox
        .map(|s| format!(r#" sandbox="{}""#, escape_attr(s)))
        .unwrap_or_default();
    Markup::trusted(format!(
        r#"<div class="{}"><iframe src="{}" frameborder="0"{}></iframe></div>"#,
        escape_attr(class),
        escape_attr(src),
        sandbox
    ))
}

/// Deterministic: equal `(url, class, probed)` always yield identical markup.
pub fn render_embed(url: &str, container_class: &str, probed: &ProbedType) -> Markup {
    match classify_content(url, probed) {
        ClassifiedContent::Image => image(url, container_class),
        ClassifiedContent::Video => video(url, container_class),
        ClassifiedContent::Webpage => frame(&normalize_scheme(url), container_class, None),
        ClassifiedContent::UnknownHeuristic(HeuristicKind::ImageSuffix) => image(url, container_class),
        ClassifiedContent::UnknownHeuristic(HeuristicKind::Fallback) => {
            frame(&normalize_scheme(url), container_class, Some(FALLBACK_SANDBOX))
        }
        ClassifiedContent::UnknownHeuristic(kind) => frame(&embed_source(url, kind), container_class, None),
        // classify_content never yields Text for a link; render it escaped anyway
        ClassifiedContent::Text => Markup::trusted(format!(
            r#"<div class="{}">{}</div>"#,
            escape_attr(container_class),
            Markup::text(url)
        )),
    }
}

/// Probe `url`, then render it under `container_class`.
pub async fn synthesize_embed(url: &str, container_class: &str, probe: &dyn ContentProbe) -> Markup {
    let probed = probe.probe(url).await;
    render_embed(url, container_class, &probed)
}
