//! Trainer promotion and profiles.

use super::auth::CurrentUser;
use super::response::{ApiError, ApiJson, ApiQuery, created, ok, parse_id};
use super::users::{UserSummary, UserView};
use super::{AppState, PageQuery};
use arena_core::{TrainerPatch, TrainerProfile, User, UserId};
use axum::Extension;
use axum::extract::{Path, State};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    pub user_id: UserId,
}

/// A profile with the account it belongs to.
#[derive(Debug, Serialize)]
pub struct TrainerView {
    pub id: UserId,
    pub bio: String,
    pub specialty: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserSummary,
}

impl From<(TrainerProfile, User)> for TrainerView {
    fn from((profile, user): (TrainerProfile, User)) -> Self {
        Self {
            id: profile.id,
            bio: profile.bio,
            specialty: profile.specialty,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
            user: user.into(),
        }
    }
}

/// POST /api/v1/trainers
pub async fn promote(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiJson(req): ApiJson<PromoteRequest>,
) -> Result<Response, ApiError> {
    caller.require_admin()?;
    let user_id = req.user_id;
    let view = state
        .run(move |store| {
            store.promote_trainer(user_id)?;
            store.trainer(user_id)
        })
        .await?;
    info!(trainer = %user_id, by = %caller.id(), "trainer promoted");
    Ok(created(TrainerView::from(view)))
}

/// GET /api/v1/trainers
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Response, ApiError> {
    let trainers = state
        .run(move |store| store.list_trainers(page.offset))
        .await?;
    Ok(ok(trainers.map(TrainerView::from)))
}

/// GET /api/v1/trainers/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: UserId = parse_id(&id, "trainer")?;
    let view = state.run(move |store| store.trainer(id)).await?;
    Ok(ok(TrainerView::from(view)))
}

/// PATCH /api/v1/trainers/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TrainerPatch>,
) -> Result<Response, ApiError> {
    let id: UserId = parse_id(&id, "trainer")?;
    caller.require_self_or_admin(id)?;
    let view = state
        .run(move |store| {
            store.update_trainer(id, patch)?;
            store.trainer(id)
        })
        .await?;
    info!(trainer = %id, "trainer profile updated");
    Ok(ok(TrainerView::from(view)))
}

/// DELETE /api/v1/trainers/{id}
pub async fn demote(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: UserId = parse_id(&id, "trainer")?;
    caller.require_admin()?;
    let user = state.run(move |store| store.demote_trainer(id)).await?;
    info!(trainer = %id, role = %user.role, by = %caller.id(), "trainer demoted");
    Ok(ok(UserView::from(user)))
}
