//! Editorial platform rating model.

use chrono::NaiveDate;
use moodbase_core::platform::PlatformCriteria;
use moodbase_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `platform_ratings` table.
#[derive(Debug, Clone, FromRow)]
pub struct PlatformRatingRow {
    pub id: DbId,
    pub offering_id: DbId,
    pub diversity: Option<f64>,
    pub accessibility: Option<f64>,
    pub qualification: Option<f64>,
    pub feedback: Option<f64>,
    pub protection: Option<f64>,
    pub privacy: Option<f64>,
    pub scientific: Option<f64>,
    pub overall_rating: Option<f64>,
    pub assessed_by: Option<String>,
    pub assessment_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PlatformRatingRow {
    pub fn criteria(&self) -> PlatformCriteria {
        PlatformCriteria {
            diversity: self.diversity,
            accessibility: self.accessibility,
            qualification: self.qualification,
            feedback: self.feedback,
            protection: self.protection,
            privacy: self.privacy,
            scientific: self.scientific,
        }
    }
}
