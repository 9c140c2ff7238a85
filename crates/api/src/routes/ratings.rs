//! Route definitions for the public ratings endpoints.

use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::handlers::ratings;
use crate::middleware::rate_limit::{rate_limit, NamedLimiter};
use crate::state::AppState;

/// Routes mounted at `/ratings`.
///
/// ```text
/// GET    /user/{offering_id}        get_user_ratings
/// GET    /platform/{offering_id}    get_platform_ratings
/// POST   /submit                    submit_rating (submission limit)
/// GET    /summary                   get_summary
/// ```
pub fn router(submissions: NamedLimiter) -> Router<AppState> {
    Router::new()
        .route("/user/{offering_id}", get(ratings::get_user_ratings))
        .route("/platform/{offering_id}", get(ratings::get_platform_ratings))
        .route(
            "/submit",
            post(ratings::submit_rating)
                .route_layer(middleware::from_fn_with_state(submissions, rate_limit)),
        )
        .route("/summary", get(ratings::get_summary))
}
