//! Handlers for the public ratings endpoints.
//!
//! Offering ids arrive as raw path strings so a malformed id is reported as
//! `INVALID_OFFERING_ID` instead of an extractor rejection.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};

use moodbase_core::rating::{
    parse_offering_id_str, parse_offering_ids, RatingLookup, RatingSubmission,
    RatingSubmissionRequest,
};

use crate::error::{AppError, AppResult};
use crate::middleware::rate_limit::ClientIp;
use crate::query::SummaryParams;
use crate::response::{CountedResponse, DataResponse, SubmittedResponse};
use crate::service::ratings::SubmissionMeta;
use crate::state::AppState;

const RATINGS_NOT_FOUND: &str = "RATINGS_NOT_FOUND";

/// GET /api/ratings/user/{offering_id}
///
/// Averages and recent comments of the approved user ratings.
pub async fn get_user_ratings(
    State(state): State<AppState>,
    Path(offering_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let offering_id = parse_offering_id_str(&offering_id)?;

    match state.ratings.get_user_ratings_for_offering(offering_id).await? {
        RatingLookup::Found(summary) => Ok(Json(DataResponse::new(summary))),
        RatingLookup::Empty | RatingLookup::SchemaNotReady => Err(AppError::not_found(
            RATINGS_NOT_FOUND,
            format!("No user ratings found for offering {offering_id}"),
        )),
    }
}

/// GET /api/ratings/platform/{offering_id}
pub async fn get_platform_ratings(
    State(state): State<AppState>,
    Path(offering_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let offering_id = parse_offering_id_str(&offering_id)?;

    match state
        .ratings
        .get_platform_ratings_for_offering(offering_id)
        .await?
    {
        RatingLookup::Found(view) => Ok(Json(DataResponse::new(view))),
        RatingLookup::Empty | RatingLookup::SchemaNotReady => Err(AppError::not_found(
            RATINGS_NOT_FOUND,
            format!("No platform rating found for offering {offering_id}"),
        )),
    }
}

/// POST /api/ratings/submit
///
/// Stage a user rating for moderation. Responds 201 with the staging id and
/// the user id the rating was recorded under.
pub async fn submit_rating(
    State(state): State<AppState>,
    client_ip: Option<Extension<ClientIp>>,
    headers: HeaderMap,
    body: Result<Json<RatingSubmissionRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let submission = RatingSubmission::parse(&request)?;

    let meta = SubmissionMeta {
        ip_address: client_ip.map(|Extension(ClientIp(ip))| ip),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    let receipt = state.ratings.submit_user_rating(&submission, meta).await?;

    if submission.user_id_generated {
        tracing::debug!(user_id = %submission.user_id, "Generated user id for anonymous submission");
    }

    Ok((
        StatusCode::CREATED,
        Json(SubmittedResponse {
            success: true,
            data: receipt,
            user_id: submission.user_id,
        }),
    ))
}

/// GET /api/ratings/summary?offeringIds=1,2,3
///
/// User and platform badges for up to 50 offerings. Offerings with no
/// rating of either kind are omitted.
pub async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> AppResult<impl IntoResponse> {
    let offering_ids = parse_offering_ids(params.offering_ids.as_deref())?;

    let summary = state
        .ratings
        .get_ratings_summary_for_offerings(&offering_ids)
        .await;
    let count = summary.len();

    Ok(Json(CountedResponse::new(summary, count)))
}
