pub mod admin;
pub mod health;
pub mod ratings;

use axum::{middleware, Router};

use crate::middleware::rate_limit::{rate_limit, RateLimiters};
use crate::state::AppState;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ratings/user/{offering_id}                      user rating summary
/// /ratings/platform/{offering_id}                  platform rating
/// /ratings/submit                                  stage a rating (POST)
/// /ratings/summary                                 bulk badges
///
/// /admin/ratings/pending                           moderation queue
/// /admin/ratings/review                            approve or reject (POST)
/// ```
///
/// Every route shares the per-IP ratings limiter; `/ratings/submit` is
/// additionally bound by the submission limiter.
pub fn api_routes(limiters: &RateLimiters) -> Router<AppState> {
    Router::new()
        .nest("/ratings", ratings::router(limiters.submissions.clone()))
        .nest("/admin/ratings", admin::router())
        .layer(middleware::from_fn_with_state(
            limiters.ratings.clone(),
            rate_limit,
        ))
}
