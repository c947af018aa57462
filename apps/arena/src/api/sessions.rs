//! Training sessions.

use super::auth::CurrentUser;
use super::response::{ApiError, ApiJson, ApiQuery, created, done, ok, parse_id};
use super::{AppState, DateQuery};
use arena_core::clock::parse_date;
use arena_core::{FacilityId, Session, SessionDraft, SessionId, SessionWithCount, UserId};
use axum::Extension;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::Serialize;
use tracing::info;

/// A session with its number of active registrations.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub session: Session,
    pub registered_count: usize,
}

impl From<SessionWithCount> for SessionView {
    fn from((session, registered_count): SessionWithCount) -> Self {
        Self {
            session,
            registered_count,
        }
    }
}

fn views(sessions: Vec<SessionWithCount>) -> Vec<SessionView> {
    sessions.into_iter().map(SessionView::from).collect()
}

/// POST /api/v1/sessions
///
/// Trainers create sessions they lead; admins may name any trainer.
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiJson(draft): ApiJson<SessionDraft>,
) -> Result<Response, ApiError> {
    caller.require_trainer_or_admin()?;
    let trainer_id = if caller.is_admin() {
        draft.trainer_id.unwrap_or(caller.id())
    } else {
        caller.id()
    };
    let session = state
        .run(move |store| store.create_session(draft, trainer_id))
        .await?;
    info!(session = %session.id, trainer = %trainer_id, date = %session.date, "session created");
    Ok(created(SessionView {
        session,
        registered_count: 0,
    }))
}

/// Load a session and check the caller leads it or is an admin.
async fn owned_session(
    state: &AppState,
    caller: &CurrentUser,
    raw: &str,
) -> Result<SessionId, ApiError> {
    let id: SessionId = parse_id(raw, "session")?;
    let session = state.run(move |store| store.session(id)).await?;
    caller.require_self_or_admin(session.trainer_id)?;
    Ok(id)
}

/// DELETE /api/v1/sessions/{id}
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = owned_session(&state, &caller, &id).await?;
    state.run(move |store| store.delete_session(id)).await?;
    info!(session = %id, by = %caller.id(), "session deleted");
    Ok(done("session deleted"))
}

/// POST /api/v1/sessions/cancel/{id}
pub async fn cancel(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = owned_session(&state, &caller, &id).await?;
    let session = state.run(move |store| store.cancel_session(id)).await?;
    info!(session = %id, by = %caller.id(), "session canceled");
    Ok(ok(session))
}

/// GET /api/v1/sessions/facility/{id}?date=
pub async fn for_facility(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Response, ApiError> {
    let facility_id: FacilityId = parse_id(&id, "facility")?;
    let sessions = state
        .run(move |store| {
            let date = query.date.as_deref().map(parse_date).transpose()?;
            store.sessions_for_facility(facility_id, date)
        })
        .await?;
    Ok(ok(views(sessions)))
}

/// GET /api/v1/sessions/trainer/{id}?date=
pub async fn for_trainer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Response, ApiError> {
    let trainer_id: UserId = parse_id(&id, "trainer")?;
    let sessions = state
        .run(move |store| {
            let date = query.date.as_deref().map(parse_date).transpose()?;
            store.sessions_for_trainer(trainer_id, date)
        })
        .await?;
    Ok(ok(views(sessions)))
}
