//! Penalties against a user's credit score.

use super::AppState;
use super::auth::CurrentUser;
use super::response::{ApiError, ApiJson, ApiQuery, created, ok, parse_id};
use arena_core::clock::parse_date;
use arena_core::{PenaltyDraft, PenaltyId, UserId};
use axum::Extension;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct IntervalQuery {
    pub start: String,
    pub end: String,
}

/// POST /api/v1/penalties
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiJson(draft): ApiJson<PenaltyDraft>,
) -> Result<Response, ApiError> {
    caller.require_trainer_or_admin()?;
    let given_by = caller.id();
    let penalty = state
        .run(move |store| store.give_penalty(draft, given_by))
        .await?;
    info!(
        penalty = %penalty.id,
        user = %penalty.user_id,
        points = penalty.points,
        by = %given_by,
        "penalty given"
    );
    Ok(created(penalty))
}

/// DELETE /api/v1/penalties/{id}
///
/// Admins may revoke any penalty; trainers only their own.
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: PenaltyId = parse_id(&id, "penalty")?;
    caller.require_trainer_or_admin()?;
    let penalty = state.run(move |store| store.penalty(id)).await?;
    caller.require_self_or_admin(penalty.given_by_id)?;
    let penalty = state.run(move |store| store.revoke_penalty(id)).await?;
    info!(penalty = %id, user = %penalty.user_id, points = penalty.points, "penalty revoked");
    Ok(ok(penalty))
}

/// GET /api/v1/penalties/user/{id}
pub async fn for_user(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let user_id: UserId = parse_id(&id, "user")?;
    caller.require_self_or_admin(user_id)?;
    let penalties = state
        .run(move |store| store.penalties_for_user(user_id))
        .await?;
    Ok(ok(penalties))
}

/// GET /api/v1/penalties/given/{id}
pub async fn given_by(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let giver: UserId = parse_id(&id, "user")?;
    caller.require_trainer_or_admin()?;
    caller.require_self_or_admin(giver)?;
    let penalties = state
        .run(move |store| store.penalties_given_by(giver))
        .await?;
    Ok(ok(penalties))
}

/// GET /api/v1/penalties/interval?start=&end=
pub async fn interval(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<IntervalQuery>,
) -> Result<Response, ApiError> {
    caller.require_admin()?;
    let penalties = state
        .run(move |store| {
            let start = parse_date(&query.start)?;
            let end = parse_date(&query.end)?;
            store.penalties_between(start, end)
        })
        .await?;
    Ok(ok(penalties))
}
