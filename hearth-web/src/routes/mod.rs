/// HTTP handlers
///
/// - `pages`: static content pages
/// - `availability`: availability search, HTML and JSON
/// - `reservation`: room selection, the reservation form and its summary
/// - `auth`: back-office login and logout
/// - `admin`: back office
/// - `health`: health check

pub mod admin;
pub mod auth;
pub mod availability;
pub mod health;
pub mod pages;
pub mod reservation;

use axum::response::{Html, IntoResponse, Redirect, Response};
use std::collections::HashMap;

use crate::app::AppState;
use crate::error::AppResult;
use crate::render::TemplateData;
use crate::session::{self, Session};

/// Session key of the reservation being assembled before the form is submitted
pub const RESERVATION_DRAFT: &str = "reservation_draft";

/// Session key of the reservation handed from the form to its summary
pub const CONFIRMED_RESERVATION: &str = "confirmed_reservation";

/// Renders `view` after folding in the session's one-shot messages
pub(crate) async fn render_page(
    state: &AppState,
    session: &Session,
    view: &str,
    data: TemplateData,
) -> AppResult<Html<String>> {
    let data = data.add_default_data(session).await;
    Ok(Html(state.renderer.render(view, &data)?))
}

/// Stores a one-shot message under `key` and redirects
///
/// `redirect` carries the status: `Redirect::to` for 303, `Redirect::temporary` for 307.
pub(crate) async fn redirect_with(
    session: &Session,
    key: &str,
    message: &str,
    redirect: Redirect,
) -> AppResult<Response> {
    session::put(session, key, message).await?;
    Ok(redirect.into_response())
}

/// Trimmed value of a submitted field, empty when absent
pub(crate) fn field<'a>(values: &'a HashMap<String, String>, key: &str) -> &'a str {
    values.get(key).map(|v| v.trim()).unwrap_or("")
}
