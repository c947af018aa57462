//! Facility catalogue and the per-day slot grid.

use super::AppState;
use super::auth::CurrentUser;
use super::response::{ApiError, ApiJson, ApiQuery, created, done, ok, parse_id};
use arena_core::clock::parse_date;
use arena_core::{FacilityDraft, FacilityId, FacilityPatch};
use axum::Extension;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct SlotsQuery {
    pub date: Option<String>,
    pub days: Option<u32>,
}

/// POST /api/v1/facility
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiJson(draft): ApiJson<FacilityDraft>,
) -> Result<Response, ApiError> {
    caller.require_admin()?;
    let facility = state.run(move |store| store.create_facility(draft)).await?;
    info!(facility = %facility.id, name = %facility.name, "facility created");
    Ok(created(facility))
}

/// GET /api/v1/facility/all
pub async fn list(State(state): State<AppState>) -> Result<Response, ApiError> {
    let facilities = state.run(|store| store.list_facilities()).await?;
    Ok(ok(facilities))
}

/// GET /api/v1/facility/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: FacilityId = parse_id(&id, "facility")?;
    let facility = state.run(move |store| store.facility(id)).await?;
    Ok(ok(facility))
}

/// PATCH /api/v1/facility/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<FacilityPatch>,
) -> Result<Response, ApiError> {
    let id: FacilityId = parse_id(&id, "facility")?;
    caller.require_admin()?;
    let facility = state
        .run(move |store| store.update_facility(id, patch))
        .await?;
    info!(facility = %facility.id, "facility updated");
    Ok(ok(facility))
}

/// DELETE /api/v1/facility/{id}
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: FacilityId = parse_id(&id, "facility")?;
    caller.require_admin()?;
    state.run(move |store| store.delete_facility(id)).await?;
    info!(facility = %id, "facility deleted");
    Ok(done("facility deleted"))
}

/// GET /api/v1/facility/{id}/slots?date=&days=
///
/// Slots booked by the caller show as `my-booking`.
pub async fn slots(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<SlotsQuery>,
) -> Result<Response, ApiError> {
    let id: FacilityId = parse_id(&id, "facility")?;
    let viewer = caller.id();
    let grids = state
        .run(move |store| {
            let from = match query.date.as_deref() {
                Some(raw) => parse_date(raw)?,
                None => store.clock().today(),
            };
            store.day_grids(id, from, query.days.unwrap_or(1), Some(viewer))
        })
        .await?;
    Ok(ok(grids))
}
