/// Availability search
///
/// - `GET /search-availability`: the search form
/// - `POST /search-availability`: rooms free for `start`..`end`; the dates are kept in
///   the session as a reservation draft until a room is chosen
/// - `POST /search-availability-json`: whether one room is free, for the room pages
///
/// Dates are `YYYY-MM-DD` and the stay is half-open: the guest leaves on `end`.

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use hearth_shared::{dates::DateRange, models::ReservationDraft};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error};

use super::{field, redirect_with, render_page, RESERVATION_DRAFT};
use crate::{
    app::AppState,
    error::AppResult,
    render::TemplateData,
    session::{self, Session},
};

type FormFields = Option<Form<HashMap<String, String>>>;

fn fields(form: FormFields) -> HashMap<String, String> {
    form.map(|Form(values)| values).unwrap_or_default()
}

pub async fn search_availability(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Html<String>> {
    render_page(&state, &session, "search-availability.page.html", TemplateData::new()).await
}

pub async fn post_search_availability(
    State(state): State<AppState>,
    session: Session,
    form: FormFields,
) -> AppResult<Response> {
    let values = fields(form);

    let range = match DateRange::parse(field(&values, "start"), field(&values, "end")) {
        Ok(range) => range,
        Err(e) => {
            debug!(error = %e, "Availability search with invalid dates");
            return redirect_with(
                &session,
                session::ERROR,
                "Please enter a valid arrival and departure date",
                Redirect::to("/search-availability"),
            )
            .await;
        }
    };

    let rooms = match state
        .repo
        .search_availability_for_all_rooms(range.start, range.end)
        .await
    {
        Ok(rooms) => rooms,
        Err(e) => {
            error!(error = %e, "Availability search failed");
            return redirect_with(
                &session,
                session::ERROR,
                "Can't check availability right now, please try again",
                Redirect::to("/"),
            )
            .await;
        }
    };

    if rooms.is_empty() {
        return redirect_with(
            &session,
            session::ERROR,
            "No availability",
            Redirect::to("/search-availability"),
        )
        .await;
    }

    session::put(&session, RESERVATION_DRAFT, &ReservationDraft::new(range)).await?;

    let data = TemplateData::new()
        .with("rooms", &rooms)
        .with_string("start_date", range.start.to_string())
        .with_string("end_date", range.end.to_string())
        .with_int("nights", range.nights());
    Ok(render_page(&state, &session, "choose-room.page.html", data)
        .await?
        .into_response())
}

/// Answer of the JSON availability check
#[derive(Debug, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub ok: bool,
    pub message: String,
    pub room_id: String,
    pub start_date: String,
    pub end_date: String,
}

pub async fn availability_json(
    State(state): State<AppState>,
    form: FormFields,
) -> Json<AvailabilityResponse> {
    let values = fields(form);
    let start = field(&values, "start");
    let end = field(&values, "end");
    let room_id = field(&values, "room_id");

    let answer = |ok: bool, message: &str| AvailabilityResponse {
        ok,
        message: message.to_string(),
        room_id: room_id.to_string(),
        start_date: start.to_string(),
        end_date: end.to_string(),
    };

    let range = match DateRange::parse(start, end) {
        Ok(range) => range,
        Err(_) => return Json(answer(false, "Invalid dates")),
    };
    let id = match room_id.parse::<i32>() {
        Ok(id) if id > 0 => id,
        _ => return Json(answer(false, "Invalid room")),
    };

    match state
        .repo
        .search_availability_by_dates_by_room_id(range.start, range.end, id)
        .await
    {
        Ok(true) => Json(answer(true, "Available!")),
        Ok(false) => Json(answer(false, "Not available for those dates")),
        Err(e) => {
            error!(room_id = id, error = %e, "Availability check failed");
            Json(answer(false, "Error querying database"))
        }
    }
}
