use serde::{Deserialize, Serialize};

/// The five SMART criteria as booleans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartAssessment {
    #[serde(default)]
    pub is_specific: bool,
    #[serde(default)]
    pub is_measurable: bool,
    #[serde(default)]
    pub is_achievable: bool,
    #[serde(default)]
    pub is_relevant: bool,
    #[serde(default)]
    pub is_time_bound: bool,
}

impl SmartAssessment {
    /// Fraction of the five criteria that hold, in `[0, 1]`.
    pub fn true_fraction(&self) -> f64 {
        let count = [
            self.is_specific,
            self.is_measurable,
            self.is_achievable,
            self.is_relevant,
            self.is_time_bound,
        ]
        .iter()
        .filter(|&&v| v)
        .count();
        count as f64 / 5.0
    }
}

/// One suggested goal with its SMART assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalCandidate {
    /// The goal text itself.
    pub goal_text: String,
    /// Why this goal was proposed.
    #[serde(default)]
    pub goal_reason: String,
    /// Evaluation period (e.g. 6ヶ月, 1年).
    #[serde(default)]
    pub evaluation_period: String,
    /// How achievement will be measured.
    #[serde(default)]
    pub evaluation_method: String,
    /// SMART criteria the model asserted for this goal.
    #[serde(default)]
    pub smart_evaluation: SmartAssessment,
    /// Model confidence in `[0, 1]`, two decimals.
    #[serde(default)]
    pub confidence: f64,
}

/// Result of scoring an arbitrary goal text against the SMART criteria.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmartEvaluation {
    pub assessment: SmartAssessment,
    /// Aggregate score in `[0, 1]`, two decimals. Taken from the model
    /// when supplied, otherwise the true-fraction of the five booleans.
    pub smart_score: f64,
    /// Improvement suggestions, in model order.
    pub suggestions: Vec<String>,
}
