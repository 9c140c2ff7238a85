//! Repository for the `platform_ratings` table (read-only).

use sqlx::PgPool;

use moodbase_core::types::DbId;

use crate::models::platform_rating::PlatformRatingRow;

/// Column list for platform_ratings queries.
const COLUMNS: &str = "id, offering_id, diversity, accessibility, qualification, feedback, \
    protection, privacy, scientific, overall_rating, assessed_by, assessment_date, notes, \
    created_at, updated_at";

/// Provides read operations for editorial platform ratings.
pub struct PlatformRatingRepo;

impl PlatformRatingRepo {
    /// Find the platform rating of an offering.
    pub async fn find_by_offering(
        pool: &PgPool,
        offering_id: DbId,
    ) -> Result<Option<PlatformRatingRow>, sqlx::Error> {
        tracing::debug!(offering_id, "Reading platform rating");
        let query = format!("SELECT {COLUMNS} FROM platform_ratings WHERE offering_id = $1");
        sqlx::query_as::<_, PlatformRatingRow>(&query)
            .bind(offering_id)
            .fetch_optional(pool)
            .await
    }

    /// Platform ratings for every offering in `offering_ids` that has one.
    pub async fn list_by_offerings(
        pool: &PgPool,
        offering_ids: &[DbId],
    ) -> Result<Vec<PlatformRatingRow>, sqlx::Error> {
        tracing::debug!(count = offering_ids.len(), "Reading bulk platform ratings");
        let query = format!(
            "SELECT {COLUMNS} FROM platform_ratings
             WHERE offering_id = ANY($1)
             ORDER BY offering_id ASC"
        );
        sqlx::query_as::<_, PlatformRatingRow>(&query)
            .bind(offering_ids)
            .fetch_all(pool)
            .await
    }
}
