//! Repository for the published `user_ratings` table and the
//! `rating_aggregations` view.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use moodbase_core::types::DbId;

use crate::models::rating::{OfferingScore, PublishedRating, RatingAverages, UserComment};

/// Column list for user_ratings queries.
const COLUMNS: &str = "id, offering_id, user_id, staging_id, overall, access, treatment, \
    helpful, effectiveness, comment, created_at, updated_at";

/// Where per-offering averages are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateSource {
    /// The precomputed `rating_aggregations` view.
    View,
    /// An aggregate computed directly over `user_ratings`.
    Table,
}

impl AggregateSource {
    /// `SELECT` producing one [`RatingAverages`] row per offering.
    fn averages_select(self) -> &'static str {
        match self {
            AggregateSource::View => {
                "SELECT offering_id, review_count, avg_overall, avg_access, avg_treatment,
                        avg_helpful, avg_effectiveness
                 FROM rating_aggregations"
            }
            AggregateSource::Table => {
                "SELECT offering_id,
                        COUNT(*)::BIGINT   AS review_count,
                        AVG(overall)       AS avg_overall,
                        AVG(access)        AS avg_access,
                        AVG(treatment)     AS avg_treatment,
                        AVG(helpful)       AS avg_helpful,
                        AVG(effectiveness) AS avg_effectiveness
                 FROM user_ratings"
            }
        }
    }

    fn group_by(self) -> &'static str {
        match self {
            AggregateSource::View => "",
            AggregateSource::Table => "GROUP BY offering_id",
        }
    }
}

/// Provides read and publish operations for published user ratings.
pub struct UserRatingRepo;

impl UserRatingRepo {
    /// Averages for one offering; `None` when it has no published ratings.
    pub async fn averages(
        pool: &PgPool,
        source: AggregateSource,
        offering_id: DbId,
    ) -> Result<Option<RatingAverages>, sqlx::Error> {
        tracing::debug!(offering_id, ?source, "Reading user rating averages");
        let query = format!(
            "{} WHERE offering_id = $1 {}",
            source.averages_select(),
            source.group_by()
        );
        sqlx::query_as::<_, RatingAverages>(&query)
            .bind(offering_id)
            .fetch_optional(pool)
            .await
    }

    /// Average overall score for each of `offering_ids` that has ratings.
    pub async fn overall_by_offering(
        pool: &PgPool,
        source: AggregateSource,
        offering_ids: &[DbId],
    ) -> Result<Vec<OfferingScore>, sqlx::Error> {
        tracing::debug!(count = offering_ids.len(), ?source, "Reading bulk user rating scores");
        let query = format!(
            "SELECT offering_id, avg_overall AS score FROM ({} WHERE offering_id = ANY($1) {}) agg",
            source.averages_select(),
            source.group_by()
        );
        sqlx::query_as::<_, OfferingScore>(&query)
            .bind(offering_ids)
            .fetch_all(pool)
            .await
    }

    /// Most recent non-empty comments for an offering, newest first.
    pub async fn recent_comments(
        pool: &PgPool,
        offering_id: DbId,
        limit: i64,
    ) -> Result<Vec<UserComment>, sqlx::Error> {
        sqlx::query_as::<_, UserComment>(
            "SELECT comment, created_at FROM user_ratings
             WHERE offering_id = $1 AND comment IS NOT NULL AND btrim(comment) <> ''
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(offering_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Find the published rating of a user for an offering.
    pub async fn find_by_offering_and_user(
        pool: &PgPool,
        offering_id: DbId,
        user_id: Uuid,
    ) -> Result<Option<PublishedRating>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_ratings WHERE offering_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, PublishedRating>(&query)
            .bind(offering_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Copy a staged rating into `user_ratings` inside `tx`.
    ///
    /// An existing published rating for the same (offering, user) is left
    /// untouched. Returns whether a row was inserted.
    pub async fn publish_from_staging(
        tx: &mut Transaction<'_, Postgres>,
        staging_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO user_ratings
                (offering_id, user_id, staging_id, overall, access, treatment, helpful,
                 effectiveness, comment)
             SELECT offering_id, user_id, id, overall, access, treatment, helpful,
                    effectiveness, comment
             FROM user_ratings_staging
             WHERE id = $1
             ON CONFLICT (offering_id, user_id) DO NOTHING",
        )
        .bind(staging_id)
        .execute(&mut **tx)
        .await?;

        let inserted = result.rows_affected() == 1;
        tracing::debug!(staging_id, inserted, "Published staged rating");
        Ok(inserted)
    }
}
