//! Shared response envelope types for API handlers.
//!
//! Successful responses use a `{ "success": true, "data": ... }` envelope,
//! optionally with extra top-level fields (`count`, `pagination`, `userId`).

use moodbase_core::moderation::Pagination;
use serde::Serialize;
use uuid::Uuid;

/// Standard `{ "success": true, "data": T }` response envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse::new(summary)))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Envelope for collections: `{ "success", "data", "count" }`.
#[derive(Debug, Serialize)]
pub struct CountedResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub count: usize,
}

impl<T: Serialize> CountedResponse<T> {
    pub fn new(data: T, count: usize) -> Self {
        Self {
            success: true,
            data,
            count,
        }
    }
}

/// Envelope for paginated collections.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub count: usize,
    pub pagination: Pagination,
}

/// Envelope for a staged submission, echoing the (possibly generated) user id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub user_id: Uuid,
}
