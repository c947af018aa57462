//! Booking endpoints.

use super::auth::CurrentUser;
use super::response::{ApiError, ApiJson, ApiQuery, created, ok, parse_id};
use super::{AppState, DateQuery, PageQuery};
use arena_core::clock::parse_date;
use arena_core::{BookingDraft, BookingId, FacilityId, UserId};
use axum::Extension;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub admin_note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IntervalQuery {
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub offset: usize,
}

/// POST /api/v1/bookings
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiJson(draft): ApiJson<BookingDraft>,
) -> Result<Response, ApiError> {
    let user_id = caller.id();
    let booking = state
        .run(move |store| store.create_booking(user_id, draft))
        .await?;
    info!(
        booking = %booking.id,
        user = %user_id,
        facility = %booking.facility_id,
        date = %booking.date,
        time = %booking.range(),
        "booking created"
    );
    Ok(created(booking))
}

/// POST /api/v1/bookings/cancel/{id}
///
/// The body is optional; only an admin's `admin_note` is kept.
pub async fn cancel(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let id: BookingId = parse_id(&id, "booking")?;
    let request: CancelRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("invalid body: {e}")))?
    };
    let booking = state.run(move |store| store.booking(id)).await?;
    caller.require_self_or_admin(booking.user_id)?;

    let note = if caller.is_admin() {
        request
            .admin_note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
    } else {
        None
    };
    let booking = state
        .run(move |store| store.cancel_booking(id, note))
        .await?;
    info!(booking = %booking.id, by = %caller.id(), "booking canceled");
    Ok(ok(booking))
}

/// GET /api/v1/bookings/facility/{id}?date=
pub async fn for_facility(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Response, ApiError> {
    let facility_id: FacilityId = parse_id(&id, "facility")?;
    let bookings = state
        .run(move |store| {
            let date = match query.date.as_deref() {
                Some(raw) => parse_date(raw)?,
                None => store.clock().today(),
            };
            store.bookings_for_facility(facility_id, date)
        })
        .await?;
    Ok(ok(bookings))
}

/// GET /api/v1/users/{id}/bookings
pub async fn for_user(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Response, ApiError> {
    let user_id: UserId = parse_id(&id, "user")?;
    caller.require_self_or_admin(user_id)?;
    let bookings = state
        .run(move |store| store.bookings_for_user(user_id, page.offset))
        .await?;
    Ok(ok(bookings))
}

/// GET /api/v1/bookings?start_date=&end_date=
pub async fn between(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<IntervalQuery>,
) -> Result<Response, ApiError> {
    caller.require_admin()?;
    let bookings = state
        .run(move |store| {
            let start = parse_date(&query.start_date)?;
            let end = parse_date(&query.end_date)?;
            store.bookings_between(start, end, query.offset)
        })
        .await?;
    Ok(ok(bookings))
}
