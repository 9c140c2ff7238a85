//! User rating models: staged submissions, published ratings, aggregates.

use moodbase_core::moderation::ReviewState;
use moodbase_core::rating::ScoreSet;
use moodbase_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A row from the `user_ratings_staging` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedRating {
    pub id: DbId,
    pub offering_id: DbId,
    pub user_id: Uuid,
    pub overall: f64,
    pub access: f64,
    pub treatment: f64,
    pub helpful: f64,
    pub effectiveness: f64,
    pub comment: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub submitted_at: Timestamp,
    pub reviewed: bool,
    pub approved: bool,
    pub reviewed_at: Option<Timestamp>,
    pub reviewed_by: Option<String>,
    pub rejection_reason: Option<String>,
}

impl StagedRating {
    pub fn state(&self) -> ReviewState {
        ReviewState::from_flags(self.reviewed, self.approved)
    }

    pub fn scores(&self) -> ScoreSet {
        ScoreSet {
            overall: self.overall,
            access: self.access,
            treatment: self.treatment,
            helpful: self.helpful,
            effectiveness: self.effectiveness,
        }
    }
}

/// DTO for staging a new user rating.
#[derive(Debug, Clone)]
pub struct CreateStagedRating {
    pub offering_id: DbId,
    pub user_id: Uuid,
    pub scores: ScoreSet,
    pub comment: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A row from the `user_ratings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedRating {
    pub id: DbId,
    pub offering_id: DbId,
    pub user_id: Uuid,
    pub staging_id: Option<DbId>,
    pub overall: f64,
    pub access: f64,
    pub treatment: f64,
    pub helpful: f64,
    pub effectiveness: f64,
    pub comment: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Unrounded per-offering averages, from the view or an ad-hoc aggregate.
#[derive(Debug, Clone, FromRow)]
pub struct RatingAverages {
    pub offering_id: DbId,
    pub review_count: i64,
    pub avg_overall: Option<f64>,
    pub avg_access: Option<f64>,
    pub avg_treatment: Option<f64>,
    pub avg_helpful: Option<f64>,
    pub avg_effectiveness: Option<f64>,
}

/// A published comment with its creation time.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct UserComment {
    #[serde(rename = "text")]
    pub comment: String,
    #[serde(rename = "date")]
    pub created_at: Timestamp,
}

/// Average overall score of one offering, used by the bulk summary.
#[derive(Debug, Clone, FromRow)]
pub struct OfferingScore {
    pub offering_id: DbId,
    pub score: Option<f64>,
}
