//! Shared query parameter types for API handlers.
//!
//! Values are kept as raw strings so that malformed input is reported with
//! the ratings error codes rather than a generic extractor rejection.

use serde::Deserialize;

/// Moderation queue parameters (`?limit=&offset=`).
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Bulk summary parameters (`?offeringIds=1,2,3`).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParams {
    pub offering_ids: Option<String>,
}
