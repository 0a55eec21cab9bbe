/// Back-office access control
///
/// [`require_auth`] guards the `/admin` routes. It relies on the session layer running
/// first, and redirects anonymous visitors to the login page with an error message.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::session::{self, Session};

/// Lets the request through only when an administrator is logged in
pub async fn require_auth(session: Session, req: Request, next: Next) -> Response {
    if session::is_logged_in(&session).await {
        return next.run(req).await;
    }

    debug!(path = %req.uri().path(), "Anonymous request to back office");
    if let Err(e) = session::put(&session, session::ERROR, "Log in first!").await {
        tracing::warn!(error = %e, "Failed to store login message");
    }
    Redirect::to("/user/login").into_response()
}
