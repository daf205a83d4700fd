use crate::dispatch::{ActionIntent, ClickEvent, DispatchOutcome, Feedback, Panel, PostScope, RootPostOutcome};
use crate::routes::{NewPostRequest, NewPostResponse};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::dispatch_action,
        crate::routes::create_post,
    ),
    components(schemas(
        ClickEvent, PostScope, ActionIntent, Panel, Feedback, DispatchOutcome,
        RootPostOutcome, NewPostRequest, NewPostResponse
    )),
    tags(
        (name = "actions", description = "Per-post controls: votes, tags, replies"),
        (name = "posts", description = "Top-level post form"),
    )
)]
pub struct ApiDoc;
