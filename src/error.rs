use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::ledger::{LedgerError, PostId};

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

/// The only fatal render failure: the post record itself is unavailable.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("post {id} unavailable: {source}")]
    PostUnavailable {
        id: PostId,
        #[source]
        source: LedgerError,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("not found")] NotFound,
    #[error("bad request")] BadRequest,
    #[error("internal error")] Internal,
}

impl From<RenderError> for ApiError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::PostUnavailable { source: LedgerError::NotFound(_), .. } => ApiError::NotFound,
            RenderError::PostUnavailable { id, source } => {
                tracing::error!(post_id = id, "render failed: {source}");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpResponse::build(status).json(ApiErrorBody { error: self.to_string() })
    }
}
