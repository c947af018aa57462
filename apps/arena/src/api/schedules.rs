//! Weekly training schedules.

use super::AppState;
use super::auth::CurrentUser;
use super::response::{ApiError, ApiJson, created, ok, parse_id};
use arena_core::{FacilityId, Schedule, ScheduleDraft, ScheduleId, Session, UserId};
use axum::Extension;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::Serialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct CreatedSchedule {
    pub schedule: Schedule,
    pub sessions: Vec<Session>,
}

/// POST /api/v1/schedules
///
/// The caller must be a trainer; the schedule is theirs.
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiJson(draft): ApiJson<ScheduleDraft>,
) -> Result<Response, ApiError> {
    if !caller.is_trainer() {
        return Err(ApiError::forbidden());
    }
    let trainer_id = caller.id();
    let (schedule, sessions) = state
        .run(move |store| store.create_schedule(trainer_id, draft))
        .await?;
    info!(
        schedule = %schedule.id,
        trainer = %trainer_id,
        weekday = schedule.weekday,
        sessions = sessions.len(),
        "schedule created"
    );
    Ok(created(CreatedSchedule { schedule, sessions }))
}

/// DELETE /api/v1/schedules/{id}
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ScheduleId = parse_id(&id, "schedule")?;
    let schedule = state.run(move |store| store.schedule(id)).await?;
    caller.require_self_or_admin(schedule.trainer_id)?;
    let canceled = state.run(move |store| store.delete_schedule(id)).await?;
    info!(schedule = %id, canceled, by = %caller.id(), "schedule deleted");
    Ok(ok(json!({ "canceled_sessions": canceled })))
}

/// GET /api/v1/schedules/trainer/{id}
pub async fn for_trainer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let trainer_id: UserId = parse_id(&id, "trainer")?;
    let schedules = state
        .run(move |store| store.schedules_for_trainer(trainer_id))
        .await?;
    Ok(ok(schedules))
}

/// GET /api/v1/schedules/facility/{id}
pub async fn for_facility(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let facility_id: FacilityId = parse_id(&id, "facility")?;
    let schedules = state
        .run(move |store| store.schedules_for_facility(facility_id))
        .await?;
    Ok(ok(schedules))
}
