//! Repository for the `user_ratings_staging` table.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use moodbase_core::moderation::ReviewDecision;
use moodbase_core::types::DbId;

use crate::models::rating::{CreateStagedRating, StagedRating};

/// Name of the partial unique index guarding one pending rating per user.
pub const PENDING_UNIQUE_INDEX: &str = "uq_user_ratings_staging_pending";

/// Column list for user_ratings_staging queries.
const COLUMNS: &str = "id, offering_id, user_id, overall, access, treatment, helpful, \
    effectiveness, comment, ip_address, user_agent, submitted_at, reviewed, approved, \
    reviewed_at, reviewed_by, rejection_reason";

/// Provides staging and moderation operations for submitted ratings.
pub struct StagedRatingRepo;

impl StagedRatingRepo {
    /// Insert a new unreviewed rating, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateStagedRating,
    ) -> Result<StagedRating, sqlx::Error> {
        tracing::debug!(offering_id = input.offering_id, "Staging user rating");
        let query = format!(
            "INSERT INTO user_ratings_staging
                (offering_id, user_id, overall, access, treatment, helpful, effectiveness,
                 comment, ip_address, user_agent, reviewed)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StagedRating>(&query)
            .bind(input.offering_id)
            .bind(input.user_id)
            .bind(input.scores.overall)
            .bind(input.scores.access)
            .bind(input.scores.treatment)
            .bind(input.scores.helpful)
            .bind(input.scores.effectiveness)
            .bind(&input.comment)
            .bind(&input.ip_address)
            .bind(&input.user_agent)
            .fetch_one(pool)
            .await
    }

    /// Whether an unreviewed rating exists for the (offering, user) pair.
    pub async fn has_pending(
        pool: &PgPool,
        offering_id: DbId,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(
                SELECT 1 FROM user_ratings_staging
                WHERE offering_id = $1 AND user_id = $2 AND reviewed = FALSE
             )",
        )
        .bind(offering_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// List unreviewed ratings, oldest submission first.
    pub async fn list_pending(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<StagedRating>, sqlx::Error> {
        tracing::debug!(limit, offset, "Listing pending user ratings");
        let query = format!(
            "SELECT {COLUMNS} FROM user_ratings_staging
             WHERE reviewed = FALSE
             ORDER BY submitted_at ASC, id ASC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, StagedRating>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Load a staged rating inside `tx`, locking it until the transaction ends.
    pub async fn lock_for_review(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
    ) -> Result<Option<StagedRating>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM user_ratings_staging WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, StagedRating>(&query)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }

    /// Record a moderation decision inside `tx`, returning the updated row.
    pub async fn mark_reviewed(
        tx: &mut Transaction<'_, Postgres>,
        id: DbId,
        decision: &ReviewDecision,
        reviewed_by: &str,
    ) -> Result<StagedRating, sqlx::Error> {
        tracing::debug!(staging_id = id, approved = decision.is_approved(), "Marking rating reviewed");
        let query = format!(
            "UPDATE user_ratings_staging SET
                reviewed = TRUE,
                approved = $2,
                reviewed_at = NOW(),
                reviewed_by = $3,
                rejection_reason = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StagedRating>(&query)
            .bind(id)
            .bind(decision.is_approved())
            .bind(reviewed_by)
            .bind(decision.rejection_reason())
            .fetch_one(&mut **tx)
            .await
    }
}
