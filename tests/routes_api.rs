#![cfg(feature = "inmem-ledger")]

use std::sync::Arc;

use actix_web::{test, web, App};
use async_trait::async_trait;
use chainboard::inmem::InMemLedger;
use chainboard::ledger::Ledger;
use chainboard::probe::{ContentProbe, ProbedType};
use chainboard::{config, AppState, Dispatcher, FeedConfig, Renderer, SecurityHeaders};

const ALICE: &str = "0xa11ce00000000000000000000000000000000001";

struct OfflineProbe;

#[async_trait]
impl ContentProbe for OfflineProbe {
    async fn probe(&self, _url: &str) -> ProbedType {
        ProbedType::Unknown
    }
}

fn state(ledger: &InMemLedger) -> AppState {
    let cfg = FeedConfig::default();
    let ledger = Arc::new(ledger.clone());
    let renderer = Renderer {
        ledger: ledger.clone(),
        blocks: ledger.clone(),
        names: ledger.clone(),
        tag_directory: Some(ledger.clone()),
        probe: Arc::new(OfflineProbe),
        config: cfg.clone(),
    };
    AppState {
        renderer: Arc::new(renderer),
        dispatcher: Arc::new(Dispatcher::new(ledger, cfg.forum_base_url)),
    }
}

async fn seeded() -> InMemLedger {
    let ledger = InMemLedger::new(ALICE);
    ledger.create_post("first post", None).await.unwrap();
    ledger.create_post("second post", None).await.unwrap();
    ledger
}

#[actix_web::test]
async fn post_fragment_and_missing_post() {
    let ledger = seeded().await;
    let app = test::init_service(
        App::new()
            .wrap(SecurityHeaders::default())
            .app_data(web::Data::new(state(&ledger)))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get().uri("/posts/1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get("content-type").unwrap().to_str().unwrap().starts_with("text/html"));
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.starts_with(r#"<article class="post" data-post-id="1">"#));
    assert!(body.contains("first post"));

    let req = test::TestRequest::get().uri("/posts/42").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
    let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(v["error"], "not found");
}

#[actix_web::test]
async fn feed_keeps_requested_order_and_skips_missing() {
    let ledger = seeded().await;
    let app = test::init_service(App::new().app_data(web::Data::new(state(&ledger))).configure(config)).await;

    let req = test::TestRequest::get().uri("/?ids=2,42,1").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains(r#"<form id="post-form""#));
    let second = body.find(r#"data-post-id="2""#).expect("post 2");
    let first = body.find(r#"data-post-id="1""#).expect("post 1");
    assert!(second < first);
    assert!(!body.contains(r#"data-post-id="42""#));
}

#[actix_web::test]
async fn tag_fragment_placeholder_then_tags() {
    let ledger = seeded().await;
    let app = test::init_service(App::new().app_data(web::Data::new(state(&ledger))).configure(config)).await;

    let req = test::TestRequest::get().uri("/posts/1/tags").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert!(String::from_utf8_lossy(&body).contains("no-tags"));

    ledger.tag_post(1, "intro").await.unwrap();
    let req = test::TestRequest::get().uri("/posts/1/tags").to_request();
    let body = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
    assert!(body.contains(r#"<a class="tag-link" href="https://forum.example/intro">"#));
}

#[actix_web::test]
async fn actions_return_outcomes() {
    let ledger = seeded().await;
    let bob = ledger.as_caller("0xb0b0000000000000000000000000000000000002");
    let app = test::init_service(App::new().app_data(web::Data::new(state(&bob))).configure(config)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/actions")
        .set_json(serde_json::json!({"target_classes": ["tag-button"], "post": {"header_id": "#1"}}))
        .to_request();
    let v: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(v, serde_json::json!({"outcome": "toggle_panel", "post_id": 1, "panel": "tag"}));

    let req = test::TestRequest::post()
        .uri("/api/v1/actions")
        .set_json(serde_json::json!({"target_classes": ["upvote-button"], "post": {"header_id": "#1"}}))
        .to_request();
    let v: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(v["outcome"], "failed");
    assert_eq!(v["feedback"], "insufficient_stake");
    assert!(v["message"].as_str().unwrap().contains("action-error"));

    let req = test::TestRequest::post()
        .uri("/api/v1/actions")
        .set_json(serde_json::json!({"target_classes": ["upvote-button"], "post": null}))
        .to_request();
    let v: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(v, serde_json::json!({"outcome": "ignored"}));
}

#[actix_web::test]
async fn root_post_form() {
    let ledger = InMemLedger::new(ALICE);
    let app = test::init_service(App::new().app_data(web::Data::new(state(&ledger))).configure(config)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .set_json(serde_json::json!({"content": "   "}))
        .to_request();
    let v: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(v, serde_json::json!({"outcome": "rejected", "clear_input": false}));

    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .set_json(serde_json::json!({"content": "https://example.com/cat.png"}))
        .to_request();
    let v: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(v, serde_json::json!({"outcome": "posted", "clear_input": true}));

    let req = test::TestRequest::get().uri("/posts/1").to_request();
    let body = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
    assert!(body.contains(r#"<img src="https://example.com/cat.png""#));
}

#[actix_web::test]
async fn page_form_submits_url_encoded() {
    let ledger = InMemLedger::new(ALICE);
    let app = test::init_service(App::new().app_data(web::Data::new(state(&ledger))).configure(config)).await;

    let req = test::TestRequest::get().uri("/").to_request();
    let page = String::from_utf8(test::call_and_read_body(&app, req).await.to_vec()).unwrap();
    assert!(page.contains(r#"<form id="post-form" method="post" action="/posts">"#));

    let req = test::TestRequest::post()
        .uri("/posts")
        .insert_header(("content-type", "application/x-www-form-urlencoded"))
        .set_payload("content=hello+world")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers().get("location").unwrap(), "/");
    assert_eq!(ledger.get_post(1).await.unwrap().body, "hello world");

    // blank submissions also land back on the feed, with nothing posted
    let req = test::TestRequest::post().uri("/posts").set_form([("content", "   ")]).to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 303);
    assert!(ledger.get_post(2).await.is_err());
}
