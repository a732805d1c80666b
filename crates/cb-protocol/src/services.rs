use serde::{Deserialize, Serialize};

/// Priority of a suggested service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServicePriority {
    /// 必須 — the plan does not work without it.
    #[serde(rename = "必須")]
    Required,
    /// 推奨 — strongly advised.
    #[default]
    #[serde(rename = "推奨")]
    Recommended,
    /// オプション — nice to have.
    #[serde(rename = "オプション")]
    Optional,
}

impl ServicePriority {
    /// Map a model-supplied label to a priority. Tolerates the English
    /// spellings some models emit; unknown labels return `None` so the
    /// caller can decide a default.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "必須" | "required" | "must" => Some(Self::Required),
            "推奨" | "recommended" => Some(Self::Recommended),
            "オプション" | "optional" | "任意" => Some(Self::Optional),
            _ => None,
        }
    }
}

/// A recommended service type with frequency and rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceNeedSuggestion {
    /// Canonical service-type name.
    pub service_type: String,
    /// Weekly frequency (e.g. 週3回).
    #[serde(default)]
    pub frequency: String,
    /// Required / recommended / optional.
    #[serde(default)]
    pub priority: ServicePriority,
    /// Why the service is needed.
    #[serde(default)]
    pub reason: String,
    /// Session length in hours, when suggested.
    #[serde(default)]
    pub duration_hours: Option<f64>,
    /// Preferred time of day (e.g. 午前), when suggested.
    #[serde(default)]
    pub preferred_time: Option<String>,
    /// Special requirements (e.g. 送迎必要), when any.
    #[serde(default)]
    pub special_requirements: Option<String>,
}

/// User profile bundle consumed from the persistence layer, used when
/// suggesting services and scoring facilities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Age in years, when known.
    #[serde(default)]
    pub age: Option<u32>,
    /// Disability category (障害種別).
    #[serde(default)]
    pub disability_type: String,
    /// Support level (障害支援区分).
    #[serde(default)]
    pub support_level: String,
    /// Ward of residence, used for the same-district convenience bonus.
    #[serde(default)]
    pub district: Option<String>,
    /// Living situation (独居, 家族と同居, ...).
    #[serde(default)]
    pub living_situation: String,
}
