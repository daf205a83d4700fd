use std::time::Duration;

use chainboard::embed::{synthesize_embed, POST_CONTENT_CLASS, TAG_CONTENT_CLASS};
use chainboard::probe::{ContentProbe, HttpProbe, ProbedType};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn head_request_reports_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/cat"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let probe = HttpProbe::default().allow_private_hosts(true);
    let got = probe.probe(&format!("{}/cat", server.uri())).await;
    assert_eq!(got, ProbedType::Known("image/png".into()));
}

#[tokio::test]
async fn missing_header_is_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/bare"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let probe = HttpProbe::default().allow_private_hosts(true);
    assert_eq!(probe.probe(&format!("{}/bare", server.uri())).await, ProbedType::Unknown);
}

#[tokio::test]
async fn transport_failure_is_unknown() {
    let probe = HttpProbe::default().allow_private_hosts(true);
    // nothing listens on port 1
    assert_eq!(probe.probe("http://127.0.0.1:1/nothing").await, ProbedType::Unknown);
}

#[tokio::test]
async fn configured_timeout_degrades_to_unknown() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "video/mp4")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let probe = HttpProbe::new(Some(Duration::from_millis(200))).allow_private_hosts(true);
    assert_eq!(probe.probe(&format!("{}/slow", server.uri())).await, ProbedType::Unknown);
}

#[tokio::test]
async fn synthesized_embeds_follow_probe() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/clip"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "video/webm"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .mount(&server)
        .await;

    let probe = HttpProbe::default().allow_private_hosts(true);
    let clip = format!("{}/clip", server.uri());
    let markup = synthesize_embed(&clip, POST_CONTENT_CLASS, &probe).await;
    assert_eq!(
        markup.as_str(),
        format!(
            r#"<div class="post-content"><video controls src="{clip}">Your browser does not support the video tag.</video></div>"#
        )
    );

    // webpages are framed over https regardless of the scheme given
    let page = format!("{}/page", server.uri());
    let markup = synthesize_embed(&page, TAG_CONTENT_CLASS, &probe).await;
    let expected_src = page.replacen("http://", "https://", 1);
    assert_eq!(
        markup.as_str(),
        format!(r#"<div class="tag-content"><iframe src="{expected_src}" frameborder="0"></iframe></div>"#)
    );
}

#[tokio::test]
async fn loopback_targets_are_never_contacted() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
        .expect(0)
        .mount(&server)
        .await;

    let probe = HttpProbe::default();
    assert_eq!(probe.probe(&format!("{}/cat.png", server.uri())).await, ProbedType::Unknown);

    // the heuristics still apply, so the link renders without a server-side fetch
    let link = format!("{}/cat.png", server.uri());
    let markup = synthesize_embed(&link, POST_CONTENT_CLASS, &probe).await;
    assert!(markup.as_str().contains(r#"<img src=""#));
}

#[tokio::test]
async fn redirects_are_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/hop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/final"))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/final"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/png"))
        .expect(0)
        .mount(&server)
        .await;

    let probe = HttpProbe::default().allow_private_hosts(true);
    assert_eq!(probe.probe(&format!("{}/hop", server.uri())).await, ProbedType::Unknown);
}
