//! Moderation decisions for staged user ratings.
//!
//! A staged rating starts out unreviewed and is decided exactly once. The
//! decided states are terminal: repeating the same decision is absorbed,
//! reversing it is a conflict.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::rating::{NumericInput, CODE_MISSING_REQUIRED_FIELDS};
use crate::types::DbId;

/// Default page size of the moderation queue.
pub const DEFAULT_PENDING_LIMIT: i64 = 50;

/// Largest page size of the moderation queue.
pub const MAX_PENDING_LIMIT: i64 = 100;

/// Reviewer recorded when the request does not name one.
pub const DEFAULT_REVIEWER: &str = "admin";

pub const CODE_INVALID_STAGING_ID: &str = "INVALID_STAGING_ID";
pub const CODE_MISSING_REJECTION_REASON: &str = "MISSING_REJECTION_REASON";
pub const CODE_ALREADY_REVIEWED: &str = "ALREADY_REVIEWED";
pub const CODE_LIMIT_TOO_HIGH: &str = "LIMIT_TOO_HIGH";
pub const CODE_INVALID_PAGINATION: &str = "INVALID_PAGINATION";
pub const CODE_INVALID_REVIEW_FIELDS: &str = "INVALID_REVIEW_FIELDS";

/// Request body of `POST /api/admin/ratings/review`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRatingRequest {
    pub staging_id: Option<NumericInput>,
    pub approved: Option<bool>,
    #[validate(length(max = 100))]
    pub reviewed_by: Option<String>,
    #[validate(length(max = 1000))]
    pub rejection_reason: Option<String>,
}

/// A validated moderation command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewCommand {
    pub staging_id: DbId,
    pub decision: ReviewDecision,
    pub reviewed_by: String,
}

impl ReviewRatingRequest {
    /// Validate the request body into a [`ReviewCommand`].
    pub fn into_command(self) -> Result<ReviewCommand, CoreError> {
        let (Some(staging_id), Some(approved)) = (self.staging_id.as_ref(), self.approved) else {
            return Err(CoreError::validation(
                CODE_MISSING_REQUIRED_FIELDS,
                "Missing required fields: stagingId and approved are required",
            ));
        };

        let staging_id = match staging_id {
            NumericInput::Number(n) if n.fract() == 0.0 && *n >= 1.0 && *n <= DbId::MAX as f64 => {
                *n as DbId
            }
            NumericInput::Text(s) => s.trim().parse::<DbId>().unwrap_or(0),
            NumericInput::Number(_) => 0,
        };
        let staging_id = validate_staging_id(staging_id)?;

        if self.validate().is_err() {
            return Err(CoreError::validation(
                CODE_INVALID_REVIEW_FIELDS,
                "Invalid review fields: reviewedBy is limited to 100 and rejectionReason to 1000 characters",
            ));
        }

        let decision = ReviewDecision::new(approved, self.rejection_reason.as_deref())?;
        let reviewed_by = self
            .reviewed_by
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REVIEWER)
            .to_string();

        Ok(ReviewCommand {
            staging_id,
            decision,
            reviewed_by,
        })
    }
}

/// A moderator's verdict on one staged rating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approved,
    Rejected { reason: String },
}

impl ReviewDecision {
    /// Build a decision; a rejection must carry a non-blank reason.
    pub fn new(approved: bool, rejection_reason: Option<&str>) -> Result<Self, CoreError> {
        if approved {
            return Ok(ReviewDecision::Approved);
        }
        match rejection_reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => Ok(ReviewDecision::Rejected {
                reason: reason.to_string(),
            }),
            None => Err(CoreError::validation(
                CODE_MISSING_REJECTION_REASON,
                "Rejection reason is required when rejecting a rating",
            )),
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, ReviewDecision::Approved)
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            ReviewDecision::Approved => None,
            ReviewDecision::Rejected { reason } => Some(reason),
        }
    }

    /// Human-readable outcome returned to the moderator.
    pub fn outcome_message(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "Rating approved and published",
            ReviewDecision::Rejected { .. } => "Rating rejected",
        }
    }
}

/// Moderation state of a staged rating, derived from its stored flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewState {
    Unreviewed,
    Approved,
    Rejected,
}

impl ReviewState {
    pub fn from_flags(reviewed: bool, approved: bool) -> Self {
        match (reviewed, approved) {
            (false, _) => ReviewState::Unreviewed,
            (true, true) => ReviewState::Approved,
            (true, false) => ReviewState::Rejected,
        }
    }

    /// Validate applying `decision` to a row in this state.
    ///
    /// Returns the resulting state. Repeating the decision already on record
    /// is allowed so that re-approval stays idempotent.
    pub fn apply(self, staging_id: DbId, decision: &ReviewDecision) -> Result<Self, CoreError> {
        let target = if decision.is_approved() {
            ReviewState::Approved
        } else {
            ReviewState::Rejected
        };
        match self {
            ReviewState::Unreviewed => Ok(target),
            current if current == target => Ok(target),
            current => Err(CoreError::conflict(
                CODE_ALREADY_REVIEWED,
                format!("Staged rating {staging_id} has already been {}", current.as_str()),
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReviewState::Unreviewed => "unreviewed",
            ReviewState::Approved => "approved",
            ReviewState::Rejected => "rejected",
        }
    }
}

/// Validate a staging id received from a client.
pub fn validate_staging_id(id: i64) -> Result<DbId, CoreError> {
    if id > 0 {
        Ok(id)
    } else {
        Err(CoreError::validation(CODE_INVALID_STAGING_ID, "Invalid staging ID"))
    }
}

/// Validated `limit`/`offset` pair for the moderation queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PENDING_LIMIT,
            offset: 0,
        }
    }
}

/// Validate optional `limit`/`offset` values.
///
/// A limit above [`MAX_PENDING_LIMIT`] is reported as `LIMIT_TOO_HIGH`; a
/// non-positive limit or negative offset as `INVALID_PAGINATION`.
pub fn validate_pagination(limit: Option<i64>, offset: Option<i64>) -> Result<Pagination, CoreError> {
    let limit = limit.unwrap_or(DEFAULT_PENDING_LIMIT);
    let offset = offset.unwrap_or(0);

    if limit > MAX_PENDING_LIMIT {
        return Err(CoreError::validation(
            CODE_LIMIT_TOO_HIGH,
            format!("Limit cannot exceed {MAX_PENDING_LIMIT}"),
        ));
    }
    if limit < 1 || offset < 0 {
        return Err(CoreError::validation(
            CODE_INVALID_PAGINATION,
            "Invalid pagination parameters",
        ));
    }
    Ok(Pagination { limit, offset })
}

/// Parse raw `limit`/`offset` query values, then validate them.
pub fn parse_pagination(limit: Option<&str>, offset: Option<&str>) -> Result<Pagination, CoreError> {
    let parse = |raw: Option<&str>| -> Result<Option<i64>, CoreError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(s) => s.parse::<i64>().map(Some).map_err(|_| {
                CoreError::validation(CODE_INVALID_PAGINATION, "Invalid pagination parameters")
            }),
        }
    };
    validate_pagination(parse(limit)?, parse(offset)?)
}
