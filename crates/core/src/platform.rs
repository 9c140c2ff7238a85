//! Editorial (platform) rating structure and category weighting.
//!
//! Platform ratings hold seven criteria grouped into three weighted
//! categories. The editorial overall score is stored alongside them; when
//! it is absent the weighted category average stands in.

use serde::Serialize;

use crate::rating::round_to_tenth;

/// Weight of the offer-type category in the overall score.
pub const OFFER_TYPE_WEIGHT: f64 = 0.3;

/// Weight of the quality category in the overall score.
pub const QUALITY_WEIGHT: f64 = 0.5;

/// Weight of the impact category in the overall score.
pub const IMPACT_WEIGHT: f64 = 0.2;

/// Raw editorial criteria as stored per offering.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlatformCriteria {
    pub diversity: Option<f64>,
    pub accessibility: Option<f64>,
    pub qualification: Option<f64>,
    pub feedback: Option<f64>,
    pub protection: Option<f64>,
    pub privacy: Option<f64>,
    pub scientific: Option<f64>,
}

/// One named criterion inside a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionScore {
    pub name: &'static str,
    pub score: Option<f64>,
}

/// A weighted group of criteria.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub weight: f64,
    /// Mean of the present criteria, rounded to one decimal.
    pub score: Option<f64>,
    pub criteria: Vec<CriterionScore>,
}

impl CategoryBreakdown {
    fn from_criteria(weight: f64, criteria: Vec<CriterionScore>) -> Self {
        let present: Vec<f64> = criteria.iter().filter_map(|c| c.score).collect();
        Self {
            weight,
            score: category_score(&present),
            criteria,
        }
    }
}

/// The three weighted categories of a platform rating.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCategories {
    pub offer_type: CategoryBreakdown,
    pub quality: CategoryBreakdown,
    pub impact: CategoryBreakdown,
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn criterion(name: &'static str, score: Option<f64>) -> CriterionScore {
    CriterionScore {
        name,
        score: finite(score),
    }
}

impl PlatformCriteria {
    /// Reshape the flat criteria into their weighted categories.
    pub fn categories(&self) -> PlatformCategories {
        PlatformCategories {
            offer_type: CategoryBreakdown::from_criteria(
                OFFER_TYPE_WEIGHT,
                vec![
                    criterion("diversity", self.diversity),
                    criterion("accessibility", self.accessibility),
                ],
            ),
            quality: CategoryBreakdown::from_criteria(
                QUALITY_WEIGHT,
                vec![
                    criterion("qualification", self.qualification),
                    criterion("feedback", self.feedback),
                    criterion("protection", self.protection),
                    criterion("privacy", self.privacy),
                ],
            ),
            impact: CategoryBreakdown::from_criteria(
                IMPACT_WEIGHT,
                vec![criterion("scientific", self.scientific)],
            ),
        }
    }
}

/// Mean of the given criterion scores rounded to one decimal.
pub fn category_score(scores: &[f64]) -> Option<f64> {
    crate::rating::mean_rounded(scores)
}

/// Weighted average of the category scores.
///
/// Categories without a score are left out and the remaining weights are
/// renormalised, so a partially assessed offering still gets a score.
pub fn weighted_overall(categories: &PlatformCategories) -> Option<f64> {
    let parts = [&categories.offer_type, &categories.quality, &categories.impact];
    let (weighted, weights) = parts
        .iter()
        .filter_map(|c| c.score.map(|s| (s * c.weight, c.weight)))
        .fold((0.0, 0.0), |(acc, w), (s, cw)| (acc + s, w + cw));

    if weights == 0.0 {
        None
    } else {
        Some(round_to_tenth(weighted / weights))
    }
}

/// Editorial overall score, falling back to the weighted category average.
pub fn resolve_overall(stored: Option<f64>, categories: &PlatformCategories) -> Option<f64> {
    finite(stored).or_else(|| weighted_overall(categories))
}
