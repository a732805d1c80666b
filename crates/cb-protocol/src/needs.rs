use serde::{Deserialize, Serialize};

/// Five-axis functional classification of an interview, following the
/// ICF model (body functions / activities / participation / environmental
/// factors / personal factors). Every axis is always present; an empty
/// string means the model produced nothing for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionalClassification {
    #[serde(default)]
    pub body_functions: String,
    #[serde(default)]
    pub activities: String,
    #[serde(default)]
    pub participation: String,
    #[serde(default)]
    pub environmental_factors: String,
    #[serde(default)]
    pub personal_factors: String,
}

impl FunctionalClassification {
    /// Axis values in canonical order, for rubric scoring and prompts.
    pub fn axes(&self) -> [&str; 5] {
        [
            &self.body_functions,
            &self.activities,
            &self.participation,
            &self.environmental_factors,
            &self.personal_factors,
        ]
    }
}

/// Structured needs profile analyzed from raw interview text.
///
/// Every list is present (possibly empty), and `confidence` is computed
/// by a deterministic rubric — it is never taken from the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NeedsProfile {
    /// Latent needs identified in the interview.
    #[serde(default)]
    pub analyzed_needs: Vec<String>,
    /// Strengths and usable resources of the person.
    #[serde(default)]
    pub strengths: Vec<String>,
    /// Challenges that require support.
    #[serde(default)]
    pub challenges: Vec<String>,
    /// Wishes stated by the person themselves.
    #[serde(default)]
    pub preferences: Vec<String>,
    /// Wishes stated by the family.
    #[serde(default)]
    pub family_wishes: Vec<String>,
    /// Five-axis functional classification.
    #[serde(default)]
    pub functional_classification: FunctionalClassification,
    /// Analysis-quality confidence in `[0, 1]`, two decimals.
    #[serde(default)]
    pub confidence: f64,
}

/// One targeted follow-up question for an incomplete interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowupQuestion {
    /// Interview topic the question belongs to (e.g. 本人の強み).
    #[serde(default)]
    pub category: String,
    /// The question text itself.
    pub question: String,
    /// Why the answer matters for the support plan.
    #[serde(default)]
    pub purpose: String,
}

/// Coverage report over the seven required interview topics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FollowupReport {
    /// Topics the interview has not covered yet.
    #[serde(default)]
    pub missing_areas: Vec<String>,
    /// 3–5 targeted questions per missing topic.
    #[serde(default)]
    pub questions: Vec<FollowupQuestion>,
    /// Interview completeness in `[0, 1]`, two decimals.
    #[serde(default)]
    pub completeness_score: f64,
    /// Whether the interview already suffices for an assessment.
    #[serde(default)]
    pub is_sufficient: bool,
}
