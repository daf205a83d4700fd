use std::sync::Arc;

use actix_web::{http::header, web, HttpResponse};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::dispatch::{ClickEvent, DispatchOutcome, Dispatcher, RootPostOutcome};
use crate::error::ApiError;
use crate::ledger::PostId;
use crate::markup::Markup;
use crate::render::Renderer;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/posts").route(web::post().to(submit_post_form)))
        .service(web::resource("/posts/{id}").route(web::get().to(post_fragment)))
        .service(web::resource("/posts/{id}/tags").route(web::get().to(tag_fragment)))
        .service(
            web::scope("/api/v1")
                .service(web::resource("/actions").route(web::post().to(dispatch_action)))
                .service(web::resource("/posts").route(web::post().to(create_post))),
        );
}

#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<Renderer>,
    pub dispatcher: Arc<Dispatcher>,
}

fn html(markup: Markup) -> HttpResponse {
    HttpResponse::Ok().content_type("text/html; charset=utf-8").body(markup.into_string())
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Comma separated post ids, rendered in the given order.
    pub ids: Option<String>,
}

fn parse_ids(raw: Option<&str>) -> Vec<PostId> {
    raw.unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}

const PAGE_HEAD: &str = concat!(
    "<!doctype html><html><head><meta charset=\"utf-8\"><title>chainboard</title></head><body>",
    r#"<form id="post-form" method="post" action="/posts">"#,
    r#"<textarea id="post-input" name="content" placeholder="Say something, or paste a link"></textarea>"#,
    r#"<button type="submit">Post</button>"#,
    r#"</form><section id="feed">"#,
);
const PAGE_TAIL: &str = "</section></body></html>";

pub async fn index(data: web::Data<AppState>, query: web::Query<FeedQuery>) -> HttpResponse {
    let ids = parse_ids(query.ids.as_deref());
    let renders = join_all(ids.iter().map(|id| data.renderer.render_post(*id))).await;
    let mut page = Markup::trusted(PAGE_HEAD);
    for (id, rendered) in ids.iter().zip(renders) {
        match rendered {
            Ok(post) => page.push(&post),
            Err(e) => warn!(post_id = id, "skipping post: {e}"),
        }
    }
    page.push(&Markup::trusted(PAGE_TAIL));
    html(page)
}

pub async fn post_fragment(data: web::Data<AppState>, path: web::Path<PostId>) -> Result<HttpResponse, ApiError> {
    let post = data.renderer.render_post(path.into_inner()).await?;
    Ok(html(post))
}

pub async fn tag_fragment(data: web::Data<AppState>, path: web::Path<PostId>) -> HttpResponse {
    html(data.renderer.fetch_tag_fragment(path.into_inner()).await)
}

#[utoipa::path(
    post,
    path = "/api/v1/actions",
    request_body = ClickEvent,
    responses(
        (status = 200, description = "Outcome of the click", body = DispatchOutcome)
    )
)]
pub async fn dispatch_action(data: web::Data<AppState>, payload: web::Json<ClickEvent>) -> HttpResponse {
    let outcome = data.dispatcher.dispatch(&payload).await;
    HttpResponse::Ok().json(outcome)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewPostRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewPostResponse {
    pub outcome: RootPostOutcome,
    pub clear_input: bool,
}

#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = NewPostRequest,
    responses(
        (status = 200, description = "Root post submitted, rejected or failed", body = NewPostResponse)
    )
)]
pub async fn create_post(data: web::Data<AppState>, payload: web::Json<NewPostRequest>) -> HttpResponse {
    let outcome = data.dispatcher.submit_root_post(&payload.content).await;
    HttpResponse::Ok().json(NewPostResponse { outcome, clear_input: outcome.clear_input() })
}

/// Browser form submission from the index page. Whatever the outcome, the
/// browser lands back on the feed.
pub async fn submit_post_form(data: web::Data<AppState>, form: web::Form<NewPostRequest>) -> HttpResponse {
    let outcome = data.dispatcher.submit_root_post(&form.content).await;
    debug!(?outcome, "form post");
    HttpResponse::SeeOther().insert_header((header::LOCATION, "/")).finish()
}
