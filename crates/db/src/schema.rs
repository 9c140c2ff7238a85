//! Startup probe of which ratings relations are provisioned.
//!
//! Deployments may run with migrations applied out of band, so the service
//! checks once at startup which tables and views exist and degrades reads
//! against missing ones to empty results instead of failing.

use serde::Serialize;
use sqlx::PgPool;

pub const STAGING_TABLE: &str = "user_ratings_staging";
pub const RATINGS_TABLE: &str = "user_ratings";
pub const PLATFORM_TABLE: &str = "platform_ratings";
pub const AGGREGATION_VIEW: &str = "rating_aggregations";

/// Which ratings relations exist in the connected database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaCapabilities {
    pub staging_table: bool,
    pub ratings_table: bool,
    pub platform_table: bool,
    pub aggregation_view: bool,
}

impl SchemaCapabilities {
    /// Every relation present.
    pub fn all() -> Self {
        Self {
            staging_table: true,
            ratings_table: true,
            platform_table: true,
            aggregation_view: true,
        }
    }

    /// No relation present.
    pub fn none() -> Self {
        Self {
            staging_table: false,
            ratings_table: false,
            platform_table: false,
            aggregation_view: false,
        }
    }

    /// Build from the list of relation names found in the database.
    pub fn from_relations<S: AsRef<str>>(names: &[S]) -> Self {
        let has = |wanted: &str| names.iter().any(|n| n.as_ref() == wanted);
        Self {
            staging_table: has(STAGING_TABLE),
            ratings_table: has(RATINGS_TABLE),
            platform_table: has(PLATFORM_TABLE),
            aggregation_view: has(AGGREGATION_VIEW),
        }
    }

    /// Query `information_schema` for the ratings relations.
    pub async fn probe(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT table_name::TEXT FROM information_schema.tables
             WHERE table_schema = current_schema()
               AND table_name = ANY($1)",
        )
        .bind([STAGING_TABLE, RATINGS_TABLE, PLATFORM_TABLE, AGGREGATION_VIEW].as_slice())
        .fetch_all(pool)
        .await?;

        let caps = Self::from_relations(&names);
        tracing::info!(?caps, "Probed ratings schema");
        Ok(caps)
    }

    pub fn is_complete(&self) -> bool {
        *self == Self::all()
    }
}
