//! User rating scores, submission parsing and aggregation arithmetic.
//!
//! Submissions arrive from loosely-typed clients: scores may be JSON numbers
//! or numeric strings, the user id may be missing. [`RatingSubmission::parse`]
//! turns a [`RatingSubmissionRequest`] into a fully validated value or a
//! [`CoreError::Validation`] carrying the code the HTTP layer reports.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::DbId;

/// Lowest accepted sub-score (inclusive).
pub const MIN_SCORE: f64 = 1.0;

/// Highest accepted sub-score (inclusive).
pub const MAX_SCORE: f64 = 5.0;

/// Maximum comment length in characters.
pub const MAX_COMMENT_LENGTH: usize = 1000;

/// Maximum number of offerings accepted by the bulk summary endpoint.
pub const MAX_SUMMARY_OFFERINGS: usize = 50;

/// Number of recent comments attached to a user rating summary.
pub const RECENT_COMMENT_LIMIT: i64 = 3;

pub const CODE_MISSING_REQUIRED_FIELDS: &str = "MISSING_REQUIRED_FIELDS";
pub const CODE_INVALID_OFFERING_ID: &str = "INVALID_OFFERING_ID";
pub const CODE_INVALID_USER_ID: &str = "INVALID_USER_ID";
pub const CODE_INVALID_RATING_VALUE: &str = "INVALID_RATING_VALUE";
pub const CODE_COMMENT_TOO_LONG: &str = "COMMENT_TOO_LONG";
pub const CODE_DUPLICATE_SUBMISSION: &str = "DUPLICATE_SUBMISSION";
pub const CODE_MISSING_OFFERING_IDS: &str = "MISSING_OFFERING_IDS";
pub const CODE_INVALID_OFFERING_IDS: &str = "INVALID_OFFERING_IDS";
pub const CODE_TOO_MANY_OFFERING_IDS: &str = "TOO_MANY_OFFERING_IDS";

/// Message returned when a pending submission already exists.
pub const DUPLICATE_SUBMISSION_MESSAGE: &str =
    "You have already submitted a rating for this offering";

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// A numeric field as sent by a client: either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

/// Request body of `POST /api/ratings/submit`.
///
/// Every field is optional at the serde level so that missing fields are
/// reported as `MISSING_REQUIRED_FIELDS` rather than a deserialization error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSubmissionRequest {
    pub offering_id: Option<NumericInput>,
    pub user_id: Option<String>,
    pub overall: Option<NumericInput>,
    pub access: Option<NumericInput>,
    pub treatment: Option<NumericInput>,
    pub helpful: Option<NumericInput>,
    pub effectiveness: Option<NumericInput>,
    pub comment: Option<String>,
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// The five user-facing sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreField {
    Overall,
    Access,
    Treatment,
    Helpful,
    Effectiveness,
}

impl ScoreField {
    pub const ALL: [ScoreField; 5] = [
        ScoreField::Overall,
        ScoreField::Access,
        ScoreField::Treatment,
        ScoreField::Helpful,
        ScoreField::Effectiveness,
    ];

    /// Field name as used in request bodies and column names.
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreField::Overall => "overall",
            ScoreField::Access => "access",
            ScoreField::Treatment => "treatment",
            ScoreField::Helpful => "helpful",
            ScoreField::Effectiveness => "effectiveness",
        }
    }
}

/// A complete set of validated sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub overall: f64,
    pub access: f64,
    pub treatment: f64,
    pub helpful: f64,
    pub effectiveness: f64,
}

impl ScoreSet {
    pub fn get(&self, field: ScoreField) -> f64 {
        match field {
            ScoreField::Overall => self.overall,
            ScoreField::Access => self.access,
            ScoreField::Treatment => self.treatment,
            ScoreField::Helpful => self.helpful,
            ScoreField::Effectiveness => self.effectiveness,
        }
    }

    /// Check every sub-score against the accepted range.
    pub fn validate(&self) -> Result<(), CoreError> {
        for field in ScoreField::ALL {
            validate_score(field, self.get(field))?;
        }
        Ok(())
    }
}

/// Ensure a score is finite and within `[MIN_SCORE, MAX_SCORE]`.
pub fn validate_score(field: ScoreField, value: f64) -> Result<f64, CoreError> {
    if value.is_finite() && (MIN_SCORE..=MAX_SCORE).contains(&value) {
        Ok(value)
    } else {
        Err(CoreError::validation(
            CODE_INVALID_RATING_VALUE,
            format!(
                "Invalid rating value for {}: must be between {MIN_SCORE:.1} and {MAX_SCORE:.1}",
                field.as_str()
            ),
        ))
    }
}

/// Parse a raw score (number or numeric string) and validate its range.
pub fn parse_score(field: ScoreField, input: &NumericInput) -> Result<f64, CoreError> {
    let value = match input {
        NumericInput::Number(n) => *n,
        NumericInput::Text(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
    };
    validate_score(field, value)
}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

fn invalid_offering_id() -> CoreError {
    CoreError::validation(CODE_INVALID_OFFERING_ID, "Invalid offering ID")
}

/// Parse a positive integer offering id from a path segment or query value.
pub fn parse_offering_id_str(raw: &str) -> Result<DbId, CoreError> {
    match raw.trim().parse::<DbId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(invalid_offering_id()),
    }
}

/// Parse a positive integer offering id from a request body field.
pub fn parse_offering_id(input: &NumericInput) -> Result<DbId, CoreError> {
    match input {
        NumericInput::Number(n) => {
            if n.is_finite() && n.fract() == 0.0 && *n >= 1.0 && *n <= DbId::MAX as f64 {
                Ok(*n as DbId)
            } else {
                Err(invalid_offering_id())
            }
        }
        NumericInput::Text(s) => parse_offering_id_str(s),
    }
}

/// Resolve the submitting user's id.
///
/// A missing or blank id gets a freshly generated UUID; anything else must
/// parse as a UUID. The boolean reports whether the id was generated.
pub fn resolve_user_id(raw: Option<&str>) -> Result<(Uuid, bool), CoreError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok((Uuid::new_v4(), true)),
        Some(s) => Uuid::parse_str(s).map(|id| (id, false)).map_err(|_| {
            CoreError::validation(CODE_INVALID_USER_ID, "Invalid user ID format")
        }),
    }
}

/// Parse the comma-separated `offeringIds` query parameter.
///
/// Empty segments (e.g. a trailing comma) are ignored, duplicates are
/// collapsed while preserving first-seen order.
pub fn parse_offering_ids(raw: Option<&str>) -> Result<Vec<DbId>, CoreError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(CoreError::validation(
            CODE_MISSING_OFFERING_IDS,
            "Missing offeringIds parameter",
        ));
    }

    let segments: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.len() > MAX_SUMMARY_OFFERINGS {
        return Err(CoreError::validation(
            CODE_TOO_MANY_OFFERING_IDS,
            format!("Too many offering IDs (maximum {MAX_SUMMARY_OFFERINGS})"),
        ));
    }

    let mut ids = Vec::with_capacity(segments.len());
    for segment in segments {
        let id = match segment.parse::<DbId>() {
            Ok(id) if id > 0 => id,
            _ => {
                return Err(CoreError::validation(
                    CODE_INVALID_OFFERING_IDS,
                    format!("Invalid offering ID in list: '{segment}'"),
                ))
            }
        };
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    if ids.is_empty() {
        return Err(CoreError::validation(
            CODE_INVALID_OFFERING_IDS,
            "Invalid offeringIds parameter",
        ));
    }
    Ok(ids)
}

// ---------------------------------------------------------------------------
// Validated submission
// ---------------------------------------------------------------------------

/// A user rating that passed every input check and may be staged.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingSubmission {
    pub offering_id: DbId,
    pub user_id: Uuid,
    /// `true` when the client did not send a user id and one was generated.
    pub user_id_generated: bool,
    pub scores: ScoreSet,
    pub comment: Option<String>,
}

impl RatingSubmission {
    /// Validate a raw request body.
    ///
    /// Checks run in the order clients see them reported: missing fields,
    /// offering id, user id, score ranges, comment length.
    pub fn parse(request: &RatingSubmissionRequest) -> Result<Self, CoreError> {
        let required: [(&str, Option<&NumericInput>); 6] = [
            ("offeringId", request.offering_id.as_ref()),
            ("overall", request.overall.as_ref()),
            ("access", request.access.as_ref()),
            ("treatment", request.treatment.as_ref()),
            ("helpful", request.helpful.as_ref()),
            ("effectiveness", request.effectiveness.as_ref()),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(CoreError::validation(
                CODE_MISSING_REQUIRED_FIELDS,
                format!("Missing required fields: {}", missing.join(", ")),
            ));
        }

        let offering_id = parse_offering_id(required[0].1.ok_or_else(invalid_offering_id)?)?;
        let (user_id, user_id_generated) = resolve_user_id(request.user_id.as_deref())?;

        let score = |field: ScoreField, input: &Option<NumericInput>| -> Result<f64, CoreError> {
            match input {
                Some(value) => parse_score(field, value),
                None => validate_score(field, f64::NAN),
            }
        };
        let scores = ScoreSet {
            overall: score(ScoreField::Overall, &request.overall)?,
            access: score(ScoreField::Access, &request.access)?,
            treatment: score(ScoreField::Treatment, &request.treatment)?,
            helpful: score(ScoreField::Helpful, &request.helpful)?,
            effectiveness: score(ScoreField::Effectiveness, &request.effectiveness)?,
        };

        let comment = validate_comment(request.comment.as_deref())?;

        Ok(Self {
            offering_id,
            user_id,
            user_id_generated,
            scores,
            comment,
        })
    }

    /// Re-run the value checks on an already constructed submission.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.offering_id <= 0 {
            return Err(invalid_offering_id());
        }
        self.scores.validate()?;
        validate_comment(self.comment.as_deref()).map(|_| ())
    }
}

fn comment_too_long() -> CoreError {
    CoreError::validation(
        CODE_COMMENT_TOO_LONG,
        format!("Comment too long (maximum {MAX_COMMENT_LENGTH} characters)"),
    )
}

/// Normalise an optional comment: blank becomes `None`, length is bounded.
pub fn validate_comment(comment: Option<&str>) -> Result<Option<String>, CoreError> {
    match comment.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(None),
        Some(c) if c.chars().count() > MAX_COMMENT_LENGTH => Err(comment_too_long()),
        Some(c) => Ok(Some(c.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Aggregation arithmetic
// ---------------------------------------------------------------------------

/// Round half away from zero to one decimal place.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Replace `None` and non-finite values with `0.0`.
pub fn finite_or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Arithmetic mean rounded to one decimal, `None` for an empty slice.
pub fn mean_rounded(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(round_to_tenth(sum / values.len() as f64))
}

// ---------------------------------------------------------------------------
// Lookup outcome
// ---------------------------------------------------------------------------

/// Outcome of a read that may legitimately find nothing.
///
/// Keeps "no rows" apart from "the relation is not provisioned yet" so that
/// callers can degrade gracefully without pretending the two are the same.
#[derive(Debug, Clone, PartialEq)]
pub enum RatingLookup<T> {
    Found(T),
    Empty,
    SchemaNotReady,
}

impl<T> RatingLookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            RatingLookup::Found(value) => Some(value),
            RatingLookup::Empty | RatingLookup::SchemaNotReady => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RatingLookup<U> {
        match self {
            RatingLookup::Found(value) => RatingLookup::Found(f(value)),
            RatingLookup::Empty => RatingLookup::Empty,
            RatingLookup::SchemaNotReady => RatingLookup::SchemaNotReady,
        }
    }
}

impl<T> From<Option<T>> for RatingLookup<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(RatingLookup::Empty, RatingLookup::Found)
    }
}
