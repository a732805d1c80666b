use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured filter extracted from a natural-language facility question.
///
/// All fields are optional; an empty filter matches everything. When
/// `service_type` is present it is always a canonical service-type name
/// (never a colloquial synonym), and `district` always carries the 区
/// suffix — both are enforced by deterministic normalization in the
/// query-understanding layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Facility name for substring matching (highest-priority condition).
    pub facility_name: Option<String>,
    /// Canonical service-type name for exact matching.
    pub service_type: Option<String>,
    /// Administrative ward, always suffixed with 区.
    pub district: Option<String>,
    /// Free keywords, each matched against name or address. Insertion
    /// order is preserved; duplicates are allowed.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SearchFilter {
    /// Degraded filter used when query understanding fails: the raw query
    /// becomes the sole keyword.
    pub fn keyword_only(query: impl Into<String>) -> Self {
        Self {
            keywords: vec![query.into()],
            ..Self::default()
        }
    }

    /// True when no condition is set (matches every facility).
    pub fn is_empty(&self) -> bool {
        self.facility_name.is_none()
            && self.service_type.is_none()
            && self.district.is_none()
            && self.keywords.is_empty()
    }
}

/// Facility record as retrieved from the graph store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityCandidate {
    /// Facility name (the only field guaranteed present in the store).
    pub name: String,
    /// Operating corporation.
    #[serde(default)]
    pub corporation_name: Option<String>,
    /// Service-type category offered by this facility.
    #[serde(default)]
    pub service_type: Option<String>,
    /// Administrative ward the facility sits in.
    #[serde(default)]
    pub district: Option<String>,
    /// Street address.
    #[serde(default)]
    pub address: Option<String>,
    /// Contact phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Capacity (定員) in persons.
    #[serde(default)]
    pub capacity: Option<u32>,
    /// Free-text availability status (空き状況).
    #[serde(default)]
    pub availability_status: Option<String>,
}

/// A facility candidate annotated with a match score during ranking.
///
/// The score, reasons, and concerns are transient: they are produced by
/// the service coordinator per request and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityMatch {
    #[serde(flatten)]
    pub facility: FacilityCandidate,
    /// Match score in `[0, 1]`, rounded to two decimals.
    pub match_score: f64,
    /// Reasons the facility fits, in model order.
    #[serde(default)]
    pub match_reasons: Vec<String>,
    /// Concerns about the fit; may be empty.
    #[serde(default)]
    pub match_concerns: Vec<String>,
}

/// Result of one search-pipeline invocation, handed to the API layer.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// The original user question.
    pub query: String,
    /// Composed natural-language answer (possibly a deterministic fallback).
    pub answer: String,
    /// Retrieved candidates in retrieval order.
    pub facilities: Vec<FacilityCandidate>,
    /// The filter the retrieval actually used.
    pub filter: SearchFilter,
    /// Convenience count of `facilities`.
    pub facility_count: usize,
    /// When the answer was produced.
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(SearchFilter::default().is_empty());
        assert!(!SearchFilter::keyword_only("送迎").is_empty());
    }

    #[test]
    fn keyword_only_carries_raw_query() {
        let filter = SearchFilter::keyword_only("八幡西区でショートステイ");
        assert_eq!(filter.keywords, vec!["八幡西区でショートステイ"]);
        assert!(filter.facility_name.is_none());
        assert!(filter.service_type.is_none());
    }

    #[test]
    fn filter_roundtrip() {
        let filter = SearchFilter {
            facility_name: None,
            service_type: Some("短期入所".into()),
            district: Some("八幡西区".into()),
            keywords: vec!["送迎".into(), "医療的ケア".into()],
        };
        let json = serde_json::to_string(&filter).unwrap();
        let back: SearchFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(back, filter);
    }

    #[test]
    fn candidate_tolerates_missing_optional_fields() {
        let candidate: FacilityCandidate =
            serde_json::from_str(r#"{"name": "みんなのhome黒崎ショート"}"#).unwrap();
        assert_eq!(candidate.name, "みんなのhome黒崎ショート");
        assert!(candidate.phone.is_none());
        assert!(candidate.capacity.is_none());
    }

    #[test]
    fn match_flattens_facility_fields() {
        let matched = FacilityMatch {
            facility: FacilityCandidate {
                name: "ケアホームひまわり".into(),
                corporation_name: None,
                service_type: Some("共同生活援助".into()),
                district: Some("小倉北区".into()),
                address: None,
                phone: Some("093-000-0000".into()),
                capacity: Some(10),
                availability_status: None,
            },
            match_score: 0.85,
            match_reasons: vec!["同じ区内".into()],
            match_concerns: vec![],
        };
        let json = serde_json::to_value(&matched).unwrap();
        assert_eq!(json["name"], "ケアホームひまわり");
        assert_eq!(json["match_score"], 0.85);
    }
}
