/// Back-office login
///
/// - `GET /user/login`: login form
/// - `POST /user/login`: checks `email` / `password`; the session token is renewed on
///   every attempt and the user ID stored on success
/// - `GET /user/logout`: discards the session and starts a fresh one

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use hearth_shared::{forms, repository::RepoError};
use std::collections::HashMap;
use tracing::{error, info};

use super::{field, redirect_with, render_page};
use crate::{
    app::AppState,
    error::AppResult,
    render::TemplateData,
    session::{self, Session, SessionError},
};

pub async fn login(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Html<String>> {
    render_page(&state, &session, "login.page.html", TemplateData::new()).await
}

pub async fn post_login(
    State(state): State<AppState>,
    session: Session,
    form: Option<Form<HashMap<String, String>>>,
) -> AppResult<Response> {
    session.cycle_id().await.map_err(SessionError::from)?;

    let values = form.map(|Form(values)| values).unwrap_or_default();
    let email = field(&values, "email").to_string();
    let password = values.get("password").cloned().unwrap_or_default();

    let mut form = forms::Form::new(values);
    form.required(&["email", "password"]);
    form.is_email("email");
    if !form.valid() {
        let data = TemplateData::new().with_form(form);
        return Ok(render_page(&state, &session, "login.page.html", data)
            .await?
            .into_response());
    }

    match state.repo.authenticate(&email, &password).await {
        Ok((user_id, _)) => {
            session::put(&session, session::USER_ID, &user_id).await?;
            info!(user_id, "Administrator logged in");
            redirect_with(
                &session,
                session::FLASH,
                "Logged in successfully",
                Redirect::to("/admin/dashboard"),
            )
            .await
        }
        Err(RepoError::InvalidCredentials) => {
            redirect_with(
                &session,
                session::ERROR,
                "Invalid login credentials",
                Redirect::to("/user/login"),
            )
            .await
        }
        Err(e) => {
            error!(error = %e, "Login failed");
            redirect_with(
                &session,
                session::ERROR,
                "Can't log in right now, please try again",
                Redirect::to("/user/login"),
            )
            .await
        }
    }
}

pub async fn logout(session: Session) -> AppResult<Response> {
    session.flush().await.map_err(SessionError::from)?;
    redirect_with(&session, session::FLASH, "Logged out", Redirect::to("/user/login")).await
}
