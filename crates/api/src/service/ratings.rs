//! Ratings service: aggregation reads, submission staging and moderation.
//!
//! Reads against relations that are not provisioned yet (according to the
//! startup [`SchemaCapabilities`] probe, or an `undefined_table` error raised
//! at query time) yield [`RatingLookup::SchemaNotReady`] instead of failing.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use moodbase_core::error::CoreError;
use moodbase_core::moderation::{Pagination, ReviewCommand, ReviewState};
use moodbase_core::platform::{resolve_overall, PlatformCategories};
use moodbase_core::rating::{
    finite_or_zero, round_to_tenth, RatingLookup, RatingSubmission, CODE_DUPLICATE_SUBMISSION,
    DUPLICATE_SUBMISSION_MESSAGE, RECENT_COMMENT_LIMIT,
};
use moodbase_core::types::DbId;
use moodbase_db::models::platform_rating::PlatformRatingRow;
use moodbase_db::models::rating::{CreateStagedRating, RatingAverages, StagedRating, UserComment};
use moodbase_db::repositories::staged_rating_repo::PENDING_UNIQUE_INDEX;
use moodbase_db::repositories::{
    AggregateSource, PlatformRatingRepo, StagedRatingRepo, UserRatingRepo,
};
use moodbase_db::{is_undefined_table, is_unique_violation, DbPool, SchemaCapabilities};

use crate::error::{AppError, AppResult};

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Averages of the published user ratings of one offering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRatingsSummary {
    pub offering_id: DbId,
    pub review_count: i64,
    pub overall: f64,
    pub access: f64,
    pub treatment: f64,
    pub helpful: f64,
    pub effectiveness: f64,
    pub comments: Vec<UserComment>,
}

impl UserRatingsSummary {
    fn from_averages(averages: RatingAverages, comments: Vec<UserComment>) -> Self {
        let score = |avg: Option<f64>| round_to_tenth(finite_or_zero(avg));
        Self {
            offering_id: averages.offering_id,
            review_count: averages.review_count,
            overall: score(averages.avg_overall),
            access: score(averages.avg_access),
            treatment: score(averages.avg_treatment),
            helpful: score(averages.avg_helpful),
            effectiveness: score(averages.avg_effectiveness),
            comments,
        }
    }
}

/// Editorial rating of one offering, grouped into weighted categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformRatingsView {
    pub offering_id: DbId,
    pub overall: Option<f64>,
    pub categories: PlatformCategories,
    pub assessed_by: Option<String>,
    pub assessment_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl From<PlatformRatingRow> for PlatformRatingsView {
    fn from(row: PlatformRatingRow) -> Self {
        let categories = row.criteria().categories();
        Self {
            offering_id: row.offering_id,
            overall: resolve_overall(row.overall_rating, &categories),
            categories,
            assessed_by: row.assessed_by,
            assessment_date: row.assessment_date,
            notes: row.notes,
        }
    }
}

/// Compact rating badge of one offering for list views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RatingBadge {
    pub user: Option<f64>,
    pub platform: Option<f64>,
}

/// Result of staging a submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub id: DbId,
    pub message: &'static str,
}

/// Request metadata recorded with a submission.
#[derive(Debug, Clone, Default)]
pub struct SubmissionMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Result of a moderation decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub staging_id: DbId,
    pub approved: bool,
    /// Whether this call inserted a published rating.
    pub published: bool,
    pub message: &'static str,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Ratings operations over a connection pool and a known schema state.
#[derive(Clone)]
pub struct RatingService {
    pool: DbPool,
    schema: SchemaCapabilities,
}

/// Convert an `undefined_table` error into [`RatingLookup::SchemaNotReady`].
fn absorb_missing_relation<T>(
    result: Result<T, sqlx::Error>,
    relation: &'static str,
) -> Result<RatingLookup<T>, sqlx::Error> {
    match result {
        Ok(value) => Ok(RatingLookup::Found(value)),
        Err(err) if is_undefined_table(&err) => {
            tracing::warn!(relation, "Ratings relation missing, treating as empty");
            Ok(RatingLookup::SchemaNotReady)
        }
        Err(err) => Err(err),
    }
}

impl RatingService {
    pub fn new(pool: DbPool, schema: SchemaCapabilities) -> Self {
        Self { pool, schema }
    }

    pub fn schema(&self) -> SchemaCapabilities {
        self.schema
    }

    fn aggregate_source(&self) -> AggregateSource {
        if self.schema.aggregation_view {
            AggregateSource::View
        } else {
            AggregateSource::Table
        }
    }

    // -- Aggregation reads --------------------------------------------------

    /// Averages and recent comments of the published ratings of an offering.
    pub async fn get_user_ratings_for_offering(
        &self,
        offering_id: DbId,
    ) -> AppResult<RatingLookup<UserRatingsSummary>> {
        if !self.schema.ratings_table {
            return Ok(RatingLookup::SchemaNotReady);
        }

        let averages = absorb_missing_relation(
            UserRatingRepo::averages(&self.pool, self.aggregate_source(), offering_id).await,
            "user_ratings",
        )?;
        let averages = match averages {
            RatingLookup::Found(Some(a)) if a.review_count > 0 => a,
            RatingLookup::Found(_) | RatingLookup::Empty => return Ok(RatingLookup::Empty),
            RatingLookup::SchemaNotReady => return Ok(RatingLookup::SchemaNotReady),
        };

        let comments = self
            .get_user_comments_for_offering(offering_id, RECENT_COMMENT_LIMIT)
            .await?;

        Ok(RatingLookup::Found(UserRatingsSummary::from_averages(
            averages, comments,
        )))
    }

    /// Up to `limit` most recent non-empty comments, newest first.
    pub async fn get_user_comments_for_offering(
        &self,
        offering_id: DbId,
        limit: i64,
    ) -> AppResult<Vec<UserComment>> {
        if !self.schema.ratings_table {
            return Ok(Vec::new());
        }
        let comments = absorb_missing_relation(
            UserRatingRepo::recent_comments(&self.pool, offering_id, limit).await,
            "user_ratings",
        )?;
        Ok(comments.into_option().unwrap_or_default())
    }

    /// Editorial rating of an offering.
    pub async fn get_platform_ratings_for_offering(
        &self,
        offering_id: DbId,
    ) -> AppResult<RatingLookup<PlatformRatingsView>> {
        if !self.schema.platform_table {
            return Ok(RatingLookup::SchemaNotReady);
        }
        let row = absorb_missing_relation(
            PlatformRatingRepo::find_by_offering(&self.pool, offering_id).await,
            "platform_ratings",
        )?;
        Ok(match row {
            RatingLookup::Found(Some(row)) => RatingLookup::Found(row.into()),
            RatingLookup::Found(None) | RatingLookup::Empty => RatingLookup::Empty,
            RatingLookup::SchemaNotReady => RatingLookup::SchemaNotReady,
        })
    }

    /// User and platform scores for a batch of offerings.
    ///
    /// Never fails: each source degrades independently, and offerings with
    /// neither score are left out of the map.
    pub async fn get_ratings_summary_for_offerings(
        &self,
        offering_ids: &[DbId],
    ) -> BTreeMap<DbId, RatingBadge> {
        let mut summary: BTreeMap<DbId, RatingBadge> = BTreeMap::new();
        if offering_ids.is_empty() {
            return summary;
        }

        match self.bulk_user_scores(offering_ids).await {
            Ok(scores) => {
                for (offering_id, score) in scores {
                    summary.entry(offering_id).or_default().user = Some(score);
                }
            }
            Err(err) => tracing::warn!(error = %err, "User rating summary unavailable"),
        }

        match self.bulk_platform_scores(offering_ids).await {
            Ok(scores) => {
                for (offering_id, score) in scores {
                    summary.entry(offering_id).or_default().platform = Some(score);
                }
            }
            Err(err) => tracing::warn!(error = %err, "Platform rating summary unavailable"),
        }

        summary
    }

    async fn bulk_user_scores(
        &self,
        offering_ids: &[DbId],
    ) -> Result<Vec<(DbId, f64)>, sqlx::Error> {
        if !self.schema.ratings_table {
            return Ok(Vec::new());
        }
        let rows = UserRatingRepo::overall_by_offering(
            &self.pool,
            self.aggregate_source(),
            offering_ids,
        )
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                row.score
                    .filter(|s| s.is_finite())
                    .map(|s| (row.offering_id, round_to_tenth(s)))
            })
            .collect())
    }

    async fn bulk_platform_scores(
        &self,
        offering_ids: &[DbId],
    ) -> Result<Vec<(DbId, f64)>, sqlx::Error> {
        if !self.schema.platform_table {
            return Ok(Vec::new());
        }
        let rows = PlatformRatingRepo::list_by_offerings(&self.pool, offering_ids).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let categories = row.criteria().categories();
                resolve_overall(row.overall_rating, &categories).map(|s| (row.offering_id, s))
            })
            .collect())
    }

    // -- Submission ----------------------------------------------------------

    /// Stage a validated user rating for moderation.
    pub async fn submit_user_rating(
        &self,
        submission: &RatingSubmission,
        meta: SubmissionMeta,
    ) -> AppResult<SubmissionReceipt> {
        submission.validate()?;
        if !self.schema.staging_table {
            return Err(CoreError::Internal("Rating staging table is not provisioned".into()).into());
        }

        if StagedRatingRepo::has_pending(&self.pool, submission.offering_id, submission.user_id)
            .await?
        {
            return Err(duplicate_submission());
        }

        let create = CreateStagedRating {
            offering_id: submission.offering_id,
            user_id: submission.user_id,
            scores: submission.scores,
            comment: submission.comment.clone(),
            ip_address: meta.ip_address,
            user_agent: meta.user_agent,
        };

        let staged = StagedRatingRepo::create(&self.pool, &create)
            .await
            .map_err(|err| {
                if is_unique_violation(&err, PENDING_UNIQUE_INDEX) {
                    duplicate_submission()
                } else {
                    AppError::Database(err)
                }
            })?;

        tracing::info!(
            staging_id = staged.id,
            offering_id = staged.offering_id,
            "User rating staged for review"
        );

        Ok(SubmissionReceipt {
            id: staged.id,
            message: "Rating submitted successfully and is pending review",
        })
    }

    // -- Moderation ----------------------------------------------------------

    /// Unreviewed ratings, oldest first.
    pub async fn get_pending_user_ratings(&self, page: Pagination) -> AppResult<Vec<StagedRating>> {
        if !self.schema.staging_table {
            return Ok(Vec::new());
        }
        let pending = absorb_missing_relation(
            StagedRatingRepo::list_pending(&self.pool, page.limit, page.offset).await,
            "user_ratings_staging",
        )?;
        Ok(pending.into_option().unwrap_or_default())
    }

    /// Apply a moderation decision and, on approval, publish the rating.
    ///
    /// Both writes happen in one transaction with the staged row locked, so
    /// a reviewed row is never visible without its publish outcome.
    pub async fn review_user_rating(&self, command: &ReviewCommand) -> AppResult<ReviewOutcome> {
        let staging_id = command.staging_id;
        let decision = &command.decision;

        let mut tx = self.pool.begin().await?;

        let staged = StagedRatingRepo::lock_for_review(&mut tx, staging_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "StagedRating",
                id: staging_id,
            })?;

        let previous = staged.state();
        previous.apply(staging_id, decision)?;

        if previous == ReviewState::Unreviewed {
            StagedRatingRepo::mark_reviewed(&mut tx, staging_id, decision, &command.reviewed_by)
                .await?;
        }

        let published = if decision.is_approved() {
            UserRatingRepo::publish_from_staging(&mut tx, staging_id).await?
        } else {
            false
        };

        tx.commit().await?;

        tracing::info!(
            staging_id,
            offering_id = staged.offering_id,
            approved = decision.is_approved(),
            published,
            reviewed_by = %command.reviewed_by,
            repeated = previous != ReviewState::Unreviewed,
            "User rating reviewed"
        );

        Ok(ReviewOutcome {
            staging_id,
            approved: decision.is_approved(),
            published,
            message: decision.outcome_message(),
        })
    }
}

fn duplicate_submission() -> AppError {
    CoreError::conflict(CODE_DUPLICATE_SUBMISSION, DUPLICATE_SUBMISSION_MESSAGE).into()
}
