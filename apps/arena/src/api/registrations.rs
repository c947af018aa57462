//! Session registrations.

use super::auth::CurrentUser;
use super::response::{ApiError, ApiJson, ApiQuery, created, ok, parse_id};
use super::users::UserSummary;
use super::{AppState, PageQuery};
use arena_core::{Registration, RegistrationId, Session, SessionId, User, UserId};
use axum::Extension;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub struct RegistrantView {
    #[serde(flatten)]
    pub registration: Registration,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
pub struct MyRegistrationView {
    #[serde(flatten)]
    pub registration: Registration,
    pub session: Session,
}

/// POST /api/v1/registrations
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Response, ApiError> {
    let user_id = caller.id();
    let registration = state
        .run(move |store| store.register(req.session_id, user_id))
        .await?;
    info!(
        registration = %registration.id,
        session = %registration.session_id,
        user = %user_id,
        "registered for session"
    );
    Ok(created(registration))
}

/// POST /api/v1/registrations/cancel/{id}
pub async fn cancel(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: RegistrationId = parse_id(&id, "registration")?;
    let registration = state.run(move |store| store.registration(id)).await?;
    caller.require_self_or_admin(registration.user_id)?;
    let registration = state
        .run(move |store| store.cancel_registration(id))
        .await?;
    info!(registration = %id, by = %caller.id(), "registration canceled");
    Ok(ok(registration))
}

/// GET /api/v1/registrations/session/{id}
///
/// Visible to the session's trainer and to admins.
pub async fn for_session(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let session_id: SessionId = parse_id(&id, "session")?;
    let session = state.run(move |store| store.session(session_id)).await?;
    caller.require_self_or_admin(session.trainer_id)?;
    let registrants = state
        .run(move |store| store.registrations_for_session(session_id))
        .await?;
    let views: Vec<RegistrantView> = registrants
        .into_iter()
        .map(|(registration, user): (Registration, User)| RegistrantView {
            registration,
            user: user.into(),
        })
        .collect();
    Ok(ok(views))
}

/// GET /api/v1/registrations/user/{id}
pub async fn for_user(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Response, ApiError> {
    let user_id: UserId = parse_id(&id, "user")?;
    caller.require_self_or_admin(user_id)?;
    let registrations = state
        .run(move |store| store.registrations_for_user(user_id, page.offset))
        .await?;
    Ok(ok(registrations.map(|(registration, session)| MyRegistrationView {
        registration,
        session,
    })))
}
