/// Error handling for the web server
///
/// Handlers return `AppResult<T>`; anything that is not turned into a flash message or
/// a re-rendered form ends up here and becomes a plain error page. Internal details are
/// logged, never shown.
///
/// # Example
///
/// ```no_run
/// use hearth_web::error::AppResult;
/// use axum::response::Html;
///
/// async fn handler() -> AppResult<Html<String>> {
///     Ok(Html("<p>ok</p>".to_string()))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use hearth_shared::repository::RepoError;
use std::fmt;

use crate::render::RenderError;
use crate::session::SessionError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// Bad request (400)
    BadRequest(String),

    /// Not found (404)
    NotFound(String),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong on our side. Please try again.".to_string(),
                )
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The site is temporarily unavailable.".to_string(),
                )
            }
        };

        let body = Html(format!(
            "<!doctype html><html><head><title>{code}</title></head>\
             <body><h1>{code}</h1><p>{message}</p><p><a href=\"/\">Home</a></p></body></html>",
            code = status,
            message = escape(&message),
        ));

        (status, body).into_response()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            RepoError::Timeout => AppError::ServiceUnavailable("store timed out".to_string()),
            other => AppError::InternalError(other.to_string()),
        }
    }
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        AppError::InternalError(format!("Render failed: {}", err))
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::InternalError(format!("Session failed: {}", err))
    }
}
