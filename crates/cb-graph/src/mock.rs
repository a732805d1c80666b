//! In-memory facility store for testing — same filter semantics as the
//! Cypher query, no network.

use async_trait::async_trait;

use cb_protocol::{FacilityCandidate, SearchFilter};

use crate::error::{StoreError, StoreResult};
use crate::store::FacilityStore;

/// A mock facility store serving pre-loaded candidates.
pub struct MockFacilityStore {
    facilities: Vec<FacilityCandidate>,
    fail: bool,
}

impl MockFacilityStore {
    pub fn new() -> Self {
        Self {
            facilities: Vec::new(),
            fail: false,
        }
    }

    pub fn with_facilities(facilities: Vec<FacilityCandidate>) -> Self {
        Self {
            facilities,
            fail: false,
        }
    }

    /// A store whose every call fails, for degraded-path tests.
    pub fn failing() -> Self {
        Self {
            facilities: Vec::new(),
            fail: true,
        }
    }

    /// Add one facility.
    pub fn add(&mut self, facility: FacilityCandidate) {
        self.facilities.push(facility);
    }

    /// Create a mock seeded with a small cross-district sample.
    pub fn with_sample_data() -> Self {
        fn facility(
            name: &str,
            service_type: &str,
            district: &str,
            address: &str,
            phone: &str,
        ) -> FacilityCandidate {
            FacilityCandidate {
                name: name.into(),
                corporation_name: Some("社会福祉法人つばさ会".into()),
                service_type: Some(service_type.into()),
                district: Some(district.into()),
                address: Some(address.into()),
                phone: Some(phone.into()),
                capacity: Some(20),
                availability_status: Some("空きあり".into()),
            }
        }

        Self::with_facilities(vec![
            facility(
                "みんなのhome黒崎ショート",
                "短期入所",
                "八幡西区",
                "北九州市八幡西区黒崎1-1-1",
                "093-000-0001",
            ),
            facility(
                "やすらぎ荘",
                "短期入所",
                "八幡西区",
                "北九州市八幡西区熊手2-2-2",
                "093-000-0002",
            ),
            facility(
                "デイサポートつばさ",
                "生活介護",
                "小倉北区",
                "北九州市小倉北区京町3-3-3",
                "093-000-0003",
            ),
            facility(
                "ヘルパーステーションさくら",
                "居宅介護",
                "小倉南区",
                "北九州市小倉南区湯川4-4-4",
                "093-000-0004",
            ),
            facility(
                "グループホームひなた",
                "共同生活援助",
                "八幡西区",
                "北九州市八幡西区穴生5-5-5",
                "093-000-0005",
            ),
        ])
    }

    fn matches(filter: &SearchFilter, facility: &FacilityCandidate) -> bool {
        if let Some(name) = &filter.facility_name {
            if !facility.name.contains(name.as_str()) {
                return false;
            }
        }
        if let Some(service_type) = &filter.service_type {
            if facility.service_type.as_deref() != Some(service_type.as_str()) {
                return false;
            }
        }
        if let Some(district) = &filter.district {
            if facility.district.as_deref() != Some(district.as_str()) {
                return false;
            }
        }
        if !filter.keywords.is_empty() {
            let address = facility.address.as_deref().unwrap_or("");
            let any = filter
                .keywords
                .iter()
                .any(|k| facility.name.contains(k.as_str()) || address.contains(k.as_str()));
            if !any {
                return false;
            }
        }
        true
    }
}

impl Default for MockFacilityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FacilityStore for MockFacilityStore {
    async fn search(&self, filter: &SearchFilter, limit: u32) -> StoreResult<Vec<FacilityCandidate>> {
        if self.fail {
            return Err(StoreError::Unreachable("mock store failure".into()));
        }
        let mut matched: Vec<FacilityCandidate> = self
            .facilities
            .iter()
            .filter(|f| Self::matches(filter, f))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name));
        matched.truncate(limit as usize);
        Ok(matched)
    }

    async fn service_types(&self) -> StoreResult<Vec<String>> {
        if self.fail {
            return Err(StoreError::Unreachable("mock store failure".into()));
        }
        let mut types: Vec<String> = self
            .facilities
            .iter()
            .filter_map(|f| f.service_type.clone())
            .collect();
        types.sort();
        types.dedup();
        Ok(types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_filter_returns_everything_sorted() {
        let store = MockFacilityStore::with_sample_data();
        let all = store.search(&SearchFilter::default(), 20).await.unwrap();
        assert_eq!(all.len(), 5);
        let names: Vec<&str> = all.iter().map(|f| f.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn limit_caps_results() {
        let store = MockFacilityStore::with_sample_data();
        let capped = store.search(&SearchFilter::default(), 2).await.unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn service_type_and_district_are_exact() {
        let store = MockFacilityStore::with_sample_data();
        let filter = SearchFilter {
            service_type: Some("短期入所".into()),
            district: Some("八幡西区".into()),
            ..SearchFilter::default()
        };
        let matched = store.search(&filter, 20).await.unwrap();
        assert_eq!(matched.len(), 2);
        assert!(matched.iter().all(|f| f.district.as_deref() == Some("八幡西区")));
    }

    #[tokio::test]
    async fn facility_name_is_substring_match() {
        let store = MockFacilityStore::with_sample_data();
        let filter = SearchFilter {
            facility_name: Some("黒崎".into()),
            ..SearchFilter::default()
        };
        let matched = store.search(&filter, 20).await.unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "みんなのhome黒崎ショート");
    }

    #[tokio::test]
    async fn keywords_match_name_or_address() {
        let store = MockFacilityStore::with_sample_data();
        let filter = SearchFilter {
            keywords: vec!["京町".into(), "さくら".into()],
            ..SearchFilter::default()
        };
        let matched = store.search(&filter, 20).await.unwrap();
        let names: Vec<&str> = matched.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["デイサポートつばさ", "ヘルパーステーションさくら"]);
    }

    #[tokio::test]
    async fn service_types_are_distinct_sorted() {
        let store = MockFacilityStore::with_sample_data();
        let types = store.service_types().await.unwrap();
        assert_eq!(types.len(), 4);
        let mut sorted = types.clone();
        sorted.sort();
        assert_eq!(types, sorted);
    }

    #[tokio::test]
    async fn failing_store_errors() {
        let store = MockFacilityStore::failing();
        assert!(store.search(&SearchFilter::default(), 20).await.is_err());
        assert!(store.service_types().await.is_err());
    }
}
