//! Facility reviews and ratings.

use super::auth::CurrentUser;
use super::response::{ApiError, ApiJson, ApiQuery, created, done, ok, parse_id};
use super::{AppState, PageQuery};
use arena_core::{FacilityId, ReviewDraft, ReviewId};
use axum::Extension;
use axum::extract::{Path, State};
use axum::response::Response;
use tracing::info;

/// POST /api/v1/facility/{id}/review
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
    ApiJson(draft): ApiJson<ReviewDraft>,
) -> Result<Response, ApiError> {
    let facility_id: FacilityId = parse_id(&id, "facility")?;
    let author = caller.id();
    let review = state
        .run(move |store| store.create_review(facility_id, author, draft))
        .await?;
    info!(review = %review.id, facility = %facility_id, rating = review.rating, "review created");
    Ok(created(review))
}

/// GET /api/v1/facility/{id}/reviews
pub async fn list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<Response, ApiError> {
    let facility_id: FacilityId = parse_id(&id, "facility")?;
    let reviews = state
        .run(move |store| store.reviews_for_facility(facility_id, page.offset))
        .await?;
    Ok(ok(reviews))
}

/// GET /api/v1/facility/{id}/rating
pub async fn rating(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let facility_id: FacilityId = parse_id(&id, "facility")?;
    let summary = state.run(move |store| store.rating(facility_id)).await?;
    Ok(ok(summary))
}

/// DELETE /api/v1/facility/review/{id}
pub async fn remove(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: ReviewId = parse_id(&id, "review")?;
    let review = state.run(move |store| store.review(id)).await?;
    caller.require_self_or_admin(review.user_id)?;
    state.run(move |store| store.delete_review(id)).await?;
    info!(review = %id, by = %caller.id(), "review deleted");
    Ok(done("review deleted"))
}
