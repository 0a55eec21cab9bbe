/// Back office
///
/// Every handler here sits behind [`crate::middleware::auth::require_auth`].
///
/// Reservation pages carry a `:src` segment naming the listing they were opened from
/// (`new`, `all` or `cal`) so that edits, processing and deletion return there. Pages
/// opened from the calendar also carry `y` / `m` to return to the same month.

use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::{Datelike, Months, NaiveDate, Utc};
use hearth_shared::{
    dates::parse_date,
    forms,
    models::{Room, RoomRestriction},
    repository::RepoError,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use super::{field, redirect_with, render_page};
use crate::{
    app::AppState,
    error::{AppError, AppResult},
    render::TemplateData,
    session::{self, Session},
};

type FormFields = Option<Form<HashMap<String, String>>>;

pub async fn dashboard(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Html<String>> {
    let new_count = state.repo.all_new_reservations().await?.len();
    let all_count = state.repo.all_reservations().await?.len();
    let room_count = state.repo.all_rooms().await?.len();

    let data = TemplateData::new()
        .with_int("new_reservations", new_count as i64)
        .with_int("all_reservations", all_count as i64)
        .with_int("rooms", room_count as i64);
    render_page(&state, &session, "admin-dashboard.page.html", data).await
}

pub async fn new_reservations(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Html<String>> {
    let reservations = state.repo.all_new_reservations().await?;
    let data = TemplateData::new().with("reservations", &reservations);
    render_page(&state, &session, "admin-new-reservations.page.html", data).await
}

pub async fn all_reservations(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Html<String>> {
    let reservations = state.repo.all_reservations().await?;
    let data = TemplateData::new().with("reservations", &reservations);
    render_page(&state, &session, "admin-all-reservations.page.html", data).await
}

/// `(year, month)` from `y` / `m`, `None` unless both name a real month
fn requested_month(params: &HashMap<String, String>) -> Option<(i32, u32)> {
    let year = field(params, "y").parse::<i32>().ok()?;
    let month = field(params, "m").parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
}

/// Calendar page for `month`, the current month when `None`
fn calendar_url(month: Option<(i32, u32)>) -> String {
    match month {
        Some((year, month)) => format!("/admin/reservations-calendar?y={}&m={}", year, month),
        None => "/admin/reservations-calendar".to_string(),
    }
}

/// Listing a reservation page was opened from
#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    New,
    All,
    Calendar { month: Option<(i32, u32)> },
}

impl Source {
    fn parse(src: &str, params: &HashMap<String, String>) -> AppResult<Self> {
        match src {
            "new" => Ok(Source::New),
            "all" => Ok(Source::All),
            "cal" => Ok(Source::Calendar {
                month: requested_month(params),
            }),
            other => Err(AppError::BadRequest(format!("unknown listing '{}'", other))),
        }
    }

    fn back_to(&self) -> String {
        match self {
            Source::New => "/admin/reservations-new".to_string(),
            Source::All => "/admin/reservations-all".to_string(),
            Source::Calendar { month } => calendar_url(*month),
        }
    }
}

fn show_data(src: &str, source: &Source, form: forms::Form, reservation: &impl Serialize) -> TemplateData {
    let mut data = TemplateData::new()
        .with("reservation", reservation)
        .with_string("src", src)
        .with_string("back_to", source.back_to())
        .with_form(form);
    if let Source::Calendar {
        month: Some((year, month)),
    } = source
    {
        data = data
            .with_string("year", year.to_string())
            .with_string("month", month.to_string());
    }
    data
}

/// `GET /admin/reservations/:src/:id/show`
pub async fn show_reservation(
    State(state): State<AppState>,
    session: Session,
    Path((src, id)): Path<(String, i32)>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Html<String>> {
    let source = Source::parse(&src, &params)?;
    let reservation = state.repo.get_reservation_by_id(id).await?;

    let values: HashMap<String, String> = [
        ("first_name", reservation.first_name.clone()),
        ("last_name", reservation.last_name.clone()),
        ("email", reservation.email.clone()),
        ("phone", reservation.phone.clone()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let data = show_data(&src, &source, forms::Form::new(values), &reservation);
    render_page(&state, &session, "admin-reservations-show.page.html", data).await
}

/// `POST /admin/reservations/:src/:id`, edits the guest details
///
/// Calendar pages send the month back as `y` / `m` form fields.
pub async fn post_show_reservation(
    State(state): State<AppState>,
    session: Session,
    Path((src, id)): Path<(String, i32)>,
    form: FormFields,
) -> AppResult<Response> {
    let values = form.map(|Form(values)| values).unwrap_or_default();
    let source = Source::parse(&src, &values)?;
    let mut reservation = state.repo.get_reservation_by_id(id).await?;

    let mut form = forms::Form::new(values);
    form.required(&["first_name", "last_name", "email"]);
    form.is_email("email");

    reservation.first_name = form.trimmed("first_name").to_string();
    reservation.last_name = form.trimmed("last_name").to_string();
    reservation.email = form.trimmed("email").to_string();
    reservation.phone = form.trimmed("phone").to_string();

    if !form.valid() {
        let data = show_data(&src, &source, form, &reservation);
        return Ok(render_page(&state, &session, "admin-reservations-show.page.html", data)
            .await?
            .into_response());
    }

    state.repo.update_reservation(&reservation).await?;
    info!(reservation_id = id, "Reservation updated");
    redirect_with(&session, session::FLASH, "Changes saved", Redirect::to(&source.back_to())).await
}

/// `GET /admin/process-reservation/:src/:id/do`
pub async fn process_reservation(
    State(state): State<AppState>,
    session: Session,
    Path((src, id)): Path<(String, i32)>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let source = Source::parse(&src, &params)?;
    state.repo.update_processed_reservation(id, true).await?;
    info!(reservation_id = id, "Reservation marked as processed");
    redirect_with(
        &session,
        session::FLASH,
        "Reservation marked as processed",
        Redirect::to(&source.back_to()),
    )
    .await
}

/// `GET /admin/delete-reservation/:src/:id/do`
pub async fn delete_reservation(
    State(state): State<AppState>,
    session: Session,
    Path((src, id)): Path<(String, i32)>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let source = Source::parse(&src, &params)?;
    state.repo.delete_reservation(id).await?;
    info!(reservation_id = id, "Reservation deleted");
    redirect_with(
        &session,
        session::FLASH,
        "Reservation deleted",
        Redirect::to(&source.back_to()),
    )
    .await
}

/// One day of a room's row in the calendar
#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: String,
    pub day: u32,
    /// Reservation occupying the night, if any
    pub reservation_id: Option<i32>,
    /// Owner block covering the night, if any
    pub block_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarRoom {
    pub room: Room,
    pub days: Vec<CalendarDay>,
}

/// First day of the requested month, the current month when `y` / `m` are absent or bad
fn month_start(params: &HashMap<String, String>) -> NaiveDate {
    let today = Utc::now().date_naive();
    requested_month(params)
        .and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1))
        .or_else(|| NaiveDate::from_ymd_opt(today.year(), today.month(), 1))
        .unwrap_or(today)
}

/// Lays out `room`'s nights from `first` up to (excluding) `next`
fn calendar_row(room: Room, restrictions: &[RoomRestriction], first: NaiveDate, next: NaiveDate) -> CalendarRoom {
    let mut reserved: BTreeMap<NaiveDate, i32> = BTreeMap::new();
    let mut blocked: BTreeMap<NaiveDate, i32> = BTreeMap::new();

    for restriction in restrictions {
        let nights = restriction
            .start_date
            .iter_days()
            .take_while(|d| *d < restriction.end_date);
        for night in nights {
            match restriction.reservation_id {
                Some(reservation_id) => {
                    reserved.insert(night, reservation_id);
                }
                None => {
                    blocked.insert(night, restriction.id);
                }
            }
        }
    }

    let days = first
        .iter_days()
        .take_while(|d| *d < next)
        .map(|date| CalendarDay {
            date: date.to_string(),
            day: date.day(),
            reservation_id: reserved.get(&date).copied(),
            block_id: blocked.get(&date).copied(),
        })
        .collect();

    CalendarRoom { room, days }
}

/// `GET /admin/reservations-calendar?y=&m=`
pub async fn reservations_calendar(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Html<String>> {
    let first = month_start(&params);
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or_else(|| AppError::BadRequest("month out of range".to_string()))?;
    let previous = first
        .checked_sub_months(Months::new(1))
        .ok_or_else(|| AppError::BadRequest("month out of range".to_string()))?;

    let mut rows = Vec::new();
    for room in state.repo.all_rooms().await? {
        let restrictions = state
            .repo
            .get_restrictions_for_room_by_day(room.id, first, next)
            .await?;
        rows.push(calendar_row(room, &restrictions, first, next));
    }

    let data = TemplateData::new()
        .with("rooms", &rows)
        .with_string("this_month", first.format("%B").to_string())
        .with_string("this_month_year", first.year().to_string())
        .with_string("this_month_number", first.month().to_string())
        .with_string("next_month", next.month().to_string())
        .with_string("next_month_year", next.year().to_string())
        .with_string("last_month", previous.month().to_string())
        .with_string("last_month_year", previous.year().to_string());
    render_page(&state, &session, "admin-reservations-calendar.page.html", data).await
}

/// Owner-block edits submitted from the calendar
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BlockChanges {
    /// Restriction IDs to remove
    pub remove: Vec<i32>,
    /// `(room_id, night)` pairs to block
    pub add: Vec<(i32, NaiveDate)>,
}

/// Reads `remove_block_<restriction id>` and `add_block_<room id>_<YYYY-MM-DD>` fields
///
/// Malformed keys are skipped. Both lists come back sorted.
pub fn parse_block_changes(values: &HashMap<String, String>) -> BlockChanges {
    let mut changes = BlockChanges::default();

    for key in values.keys() {
        if let Some(id) = key.strip_prefix("remove_block_") {
            match id.parse::<i32>() {
                Ok(id) => changes.remove.push(id),
                Err(_) => debug!(key = %key, "Skipping malformed block removal"),
            }
        } else if let Some(rest) = key.strip_prefix("add_block_") {
            let parsed = rest.split_once('_').and_then(|(room, date)| {
                Some((room.parse::<i32>().ok()?, parse_date(date).ok()?))
            });
            match parsed {
                Some(block) => changes.add.push(block),
                None => debug!(key = %key, "Skipping malformed block addition"),
            }
        }
    }

    changes.remove.sort_unstable();
    changes.add.sort_unstable();
    changes
}

/// `POST /admin/reservations-calendar`
pub async fn post_reservations_calendar(
    State(state): State<AppState>,
    session: Session,
    form: FormFields,
) -> AppResult<Response> {
    let values = form.map(|Form(values)| values).unwrap_or_default();
    let changes = parse_block_changes(&values);

    for id in &changes.remove {
        match state.repo.delete_block_for_room(*id).await {
            Ok(()) => {}
            // already gone, e.g. removed from another tab
            Err(RepoError::NotFound(_)) => debug!(block_id = id, "Owner block already removed"),
            Err(e) => return Err(e.into()),
        }
    }
    for (room_id, night) in &changes.add {
        state.repo.insert_block_for_room(*room_id, *night).await?;
    }

    info!(
        removed = changes.remove.len(),
        added = changes.add.len(),
        "Owner blocks updated"
    );

    let back_to = calendar_url(requested_month(&values));
    redirect_with(&session, session::FLASH, "Changes saved", Redirect::to(&back_to)).await
}
