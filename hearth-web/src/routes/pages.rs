/// Content pages

use axum::{extract::State, response::Html};

use super::render_page;
use crate::{app::AppState, error::AppResult, render::TemplateData, session::Session};

pub async fn home(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Html<String>> {
    render_page(&state, &session, "home.page.html", TemplateData::new()).await
}

pub async fn about(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Html<String>> {
    render_page(&state, &session, "about.page.html", TemplateData::new()).await
}

pub async fn contact(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Html<String>> {
    render_page(&state, &session, "contact.page.html", TemplateData::new()).await
}

/// General's Quarters, room 1
pub async fn generals(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Html<String>> {
    let data = TemplateData::new().with_int("room_id", 1);
    render_page(&state, &session, "generals.page.html", data).await
}

/// Major's Suite, room 2
pub async fn majors(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Html<String>> {
    let data = TemplateData::new().with_int("room_id", 2);
    render_page(&state, &session, "majors.page.html", data).await
}
