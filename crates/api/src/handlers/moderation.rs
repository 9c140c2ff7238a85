//! Handlers for the moderation queue.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;

use moodbase_core::moderation::{parse_pagination, ReviewRatingRequest};

use crate::error::{AppError, AppResult};
use crate::query::PaginationParams;
use crate::response::{DataResponse, PagedResponse};
use crate::state::AppState;

/// GET /api/admin/ratings/pending?limit=&offset=
///
/// Unreviewed submissions, oldest first.
pub async fn list_pending(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let pagination = parse_pagination(params.limit.as_deref(), params.offset.as_deref())?;

    let pending = state.ratings.get_pending_user_ratings(pagination).await?;

    Ok(Json(PagedResponse {
        success: true,
        count: pending.len(),
        data: pending,
        pagination,
    }))
}

/// POST /api/admin/ratings/review
///
/// Approve (and publish) or reject a staged rating.
pub async fn review_rating(
    State(state): State<AppState>,
    body: Result<Json<ReviewRatingRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let command = request.into_command()?;

    let outcome = state.ratings.review_user_rating(&command).await?;

    Ok(Json(DataResponse::new(outcome)))
}
