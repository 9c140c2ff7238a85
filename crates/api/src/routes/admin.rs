//! Route definitions for the moderation queue.
//!
//! Authentication is expected to be enforced in front of this service.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::moderation;
use crate::state::AppState;

/// Routes mounted at `/admin/ratings`.
///
/// ```text
/// GET    /pending                   list_pending
/// POST   /review                    review_rating
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pending", get(moderation::list_pending))
        .route("/review", post(moderation::review_rating))
}
