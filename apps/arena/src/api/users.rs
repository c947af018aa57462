//! Sign-up, login, and account management.

use super::auth::{CurrentUser, hash_password, verify_password};
use super::response::{ApiError, ApiJson, ApiQuery, created, ok, parse_id};
use super::AppState;
use arena_core::{NewUser, Role, User, UserId, UserPatch};
use axum::Extension;
use axum::extract::{Path, State};
use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

/// A user as the API shows it; never carries the password hash.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub phone: Option<String>,
    pub credit_score: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            phone: user.phone,
            credit_score: user.credit_score,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Name and email only, for listings that embed a user.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}

/// Tracked login keys before stale ones are swept.
const LIMITER_KEYS: usize = 10_000;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub q: Option<String>,
    #[serde(default)]
    pub offset: usize,
}

/// POST /api/v1/users
pub async fn register(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewUser>,
) -> Result<Response, ApiError> {
    let user = state
        .run(move |store| {
            new.validate(false)?;
            let hash = hash_password(&new.password)?;
            store.create_user(new, hash)
        })
        .await?;
    info!(user = %user.id, role = %user.role, "user registered");
    Ok(created(json!({ "user_id": user.id })))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let key = req.email.trim().to_ascii_lowercase();
    if state.login_limiter.check_key(&key).is_err() {
        warn!(email = %key, "login rate limited");
        return Err(ApiError::RateLimited);
    }
    if state.login_limiter.len() > LIMITER_KEYS {
        state.login_limiter.retain_recent();
    }
    let user = state
        .run(move |store| {
            Ok(store
                .user_by_email(&req.email)?
                .filter(|u| u.is_active && verify_password(&req.password, &u.password_hash)))
        })
        .await?
        .ok_or_else(|| ApiError::unauthorized("invalid credentials"))?;

    let now = state.store.clock().now_utc().timestamp();
    let token = state.tokens.issue(user.id, now)?;
    info!(user = %user.id, "login");
    Ok(ok(json!({ "token": token })))
}

/// GET /api/v1/users/me
pub async fn me(Extension(caller): Extension<CurrentUser>) -> Response {
    ok(UserView::from(caller.0))
}

/// GET /api/v1/users/all
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> Result<Response, ApiError> {
    caller.require_admin()?;
    let page = state
        .run(move |store| store.list_users(query.q.as_deref(), query.offset))
        .await?;
    Ok(ok(page.map(UserView::from)))
}

/// GET /api/v1/users/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: UserId = parse_id(&id, "user")?;
    caller.require_self_or_admin(id)?;
    let user = state.run(move |store| store.user(id)).await?;
    Ok(ok(UserView::from(user)))
}

/// PATCH /api/v1/users/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<UserPatch>,
) -> Result<Response, ApiError> {
    let id: UserId = parse_id(&id, "user")?;
    caller.require_self_or_admin(id)?;
    if patch.touches_admin_fields() {
        caller.require_admin()?;
    }
    let actor = caller.id();
    let user = state
        .run(move |store| store.update_user(id, actor, patch))
        .await?;
    info!(user = %user.id, by = %actor, "user updated");
    Ok(ok(UserView::from(user)))
}

/// DELETE /api/v1/users/{id}
pub async fn deactivate(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: UserId = parse_id(&id, "user")?;
    caller.require_admin()?;
    let actor = caller.id();
    let user = state
        .run(move |store| store.deactivate_user(id, actor))
        .await?;
    info!(user = %user.id, by = %actor, "user deactivated");
    Ok(ok(UserView::from(user)))
}
