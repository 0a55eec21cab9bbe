/// Reservation handlers
///
/// A booking moves through the session in two steps:
///
/// 1. the dates (and later the room) sit in a [`ReservationDraft`] under
///    [`RESERVATION_DRAFT`] while the guest picks a room and fills in the form
/// 2. a confirmed reservation sits under [`CONFIRMED_RESERVATION`] until the summary page
///    pops it, so the summary can be shown exactly once
///
/// The submission itself is [`hearth_shared::booking::submit_reservation`]. A confirmed
/// booking also queues the guest confirmation and owner notification mail.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use hearth_shared::{
    booking::{submit_reservation, BookingOutcome, Rejection},
    dates::DateRange,
    forms,
    models::{Reservation, ReservationDraft, Room},
};
use std::collections::HashMap;
use tracing::{debug, error, warn};

use super::{field, redirect_with, render_page, CONFIRMED_RESERVATION, RESERVATION_DRAFT};
use crate::{
    app::AppState,
    error::AppResult,
    mail::booking_messages,
    render::TemplateData,
    session::{self, Session},
};

const MISSING_DRAFT: &str = "Can't get reservation from session";

async fn draft(session: &Session) -> Option<ReservationDraft> {
    match session.get::<ReservationDraft>(RESERVATION_DRAFT).await {
        Ok(draft) => draft,
        Err(e) => {
            warn!(error = %e, "Discarding unreadable reservation draft");
            if let Err(e) = session.remove_value(RESERVATION_DRAFT).await {
                warn!(error = %e, "Failed to discard reservation draft");
            }
            None
        }
    }
}

/// `GET /choose-room/:id`
pub async fn choose_room(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let Ok(room_id) = id.parse::<i32>() else {
        return redirect_with(&session, session::ERROR, "Invalid room", Redirect::to("/")).await;
    };

    let Some(mut draft) = draft(&session).await else {
        return redirect_with(&session, session::ERROR, MISSING_DRAFT, Redirect::to("/")).await;
    };

    if let Err(e) = state.repo.get_room_by_id(room_id).await {
        debug!(room_id, error = %e, "Room chosen from search is unknown");
        return redirect_with(&session, session::ERROR, "Can't find room", Redirect::to("/")).await;
    }

    draft.room_id = Some(room_id);
    session::put(&session, RESERVATION_DRAFT, &draft).await?;
    Ok(Redirect::to("/make-reservation").into_response())
}

/// `GET /book-room?id=&s=&e=`, booking straight from a room page
pub async fn book_room(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let range = match DateRange::parse(field(&params, "s"), field(&params, "e")) {
        Ok(range) => range,
        Err(_) => {
            return redirect_with(&session, session::ERROR, "Invalid dates", Redirect::to("/")).await
        }
    };
    let room = match field(&params, "id").parse::<i32>() {
        Ok(id) => state.repo.get_room_by_id(id).await.ok(),
        Err(_) => None,
    };
    let Some(room) = room else {
        return redirect_with(&session, session::ERROR, "Can't find room", Redirect::to("/")).await;
    };

    let mut draft = ReservationDraft::new(range);
    draft.room_id = Some(room.id);
    session::put(&session, RESERVATION_DRAFT, &draft).await?;
    Ok(Redirect::to("/make-reservation").into_response())
}

fn reservation_form_data(form: forms::Form, room: Option<&Room>) -> TemplateData {
    let mut data = TemplateData::new();
    if let Some(room) = room {
        data = data
            .with_string("room_name", room.room_name.clone())
            .with_int("room_id", room.id as i64);
    }
    data.with_form(form)
}

/// `GET /make-reservation`
pub async fn make_reservation(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let Some(draft) = draft(&session).await else {
        return redirect_with(&session, session::ERROR, MISSING_DRAFT, Redirect::temporary("/")).await;
    };
    let Some(room_id) = draft.room_id else {
        return redirect_with(&session, session::ERROR, MISSING_DRAFT, Redirect::temporary("/")).await;
    };

    let room = match state.repo.get_room_by_id(room_id).await {
        Ok(room) => room,
        Err(e) => {
            warn!(room_id, error = %e, "Reservation draft points at an unknown room");
            return redirect_with(
                &session,
                session::ERROR,
                "Can't find room",
                Redirect::temporary("/"),
            )
            .await;
        }
    };

    let values: HashMap<String, String> = [
        ("start_date", draft.start_date.to_string()),
        ("end_date", draft.end_date.to_string()),
        ("room_id", room.id.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let data = reservation_form_data(forms::Form::new(values), Some(&room));
    Ok(render_page(&state, &session, "make-reservation.page.html", data)
        .await?
        .into_response())
}

/// `POST /make-reservation`
///
/// A missing or unreadable body is handled like a form with every field blank.
pub async fn post_make_reservation(
    State(state): State<AppState>,
    session: Session,
    form: Option<Form<HashMap<String, String>>>,
) -> AppResult<Response> {
    let values = form.map(|Form(values)| values).unwrap_or_default();

    match submit_reservation(state.repo.as_ref(), values, state.config.booking_timeout()).await {
        BookingOutcome::Confirmed(reservation) => {
            session
                .remove_value(RESERVATION_DRAFT)
                .await
                .map_err(session::SessionError::from)?;
            session::put(&session, CONFIRMED_RESERVATION, &reservation).await?;

            for message in booking_messages(&reservation, &state.config.mail) {
                state.mail.queue(message);
            }
            Ok(Redirect::to("/reservation-summary").into_response())
        }
        BookingOutcome::RejectedInput { form, room, reason } => {
            if reason != Rejection::InvalidFields {
                session::put(&session, session::ERROR, reason.message()).await?;
            }
            let room = match room {
                Some(room) => Some(room),
                None => match form.trimmed("room_id").parse::<i32>() {
                    Ok(id) => state.repo.get_room_by_id(id).await.ok(),
                    Err(_) => None,
                },
            };
            let data = reservation_form_data(form, room.as_ref());
            let page = render_page(&state, &session, "make-reservation.page.html", data).await?;
            Ok((StatusCode::OK, page).into_response())
        }
        BookingOutcome::PersistenceFailed(e) => {
            error!(error = %e, "Reservation could not be stored");
            redirect_with(
                &session,
                session::ERROR,
                "Can't save your reservation right now, please try again",
                Redirect::to("/"),
            )
            .await
        }
    }
}

/// `GET /reservation-summary`, shown once per confirmed reservation
pub async fn reservation_summary(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let reservation = match session.remove::<Reservation>(CONFIRMED_RESERVATION).await {
        Ok(found) => found,
        Err(e) => {
            warn!(error = %e, "Discarding unreadable confirmed reservation");
            None
        }
    };

    let Some(reservation) = reservation else {
        return redirect_with(
            &session,
            session::ERROR,
            MISSING_DRAFT,
            Redirect::temporary("/search-availability"),
        )
        .await;
    };

    let data = TemplateData::new()
        .with("reservation", &reservation)
        .with_string("start_date", reservation.start_date.to_string())
        .with_string("end_date", reservation.end_date.to_string())
        .with_int("nights", reservation.date_range().nights());
    let page: Html<String> =
        render_page(&state, &session, "reservation-summary.page.html", data).await?;
    Ok(page.into_response())
}
