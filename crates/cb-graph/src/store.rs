//! The `FacilityStore` seam and its Neo4j-backed implementation.

use async_trait::async_trait;
use serde_json::Map;

use cb_protocol::{FacilityCandidate, SearchFilter};

use crate::client::Neo4jHttpClient;
use crate::cypher;
use crate::error::{StoreError, StoreResult};

/// Read-only facility retrieval.
///
/// Implementations must return candidates ordered by name ascending and
/// capped at `limit`, so pagination stays deterministic regardless of
/// backend.
#[async_trait]
pub trait FacilityStore: Send + Sync {
    /// Retrieve facilities matching the filter.
    async fn search(&self, filter: &SearchFilter, limit: u32) -> StoreResult<Vec<FacilityCandidate>>;

    /// Distinct service types present in the store, sorted.
    async fn service_types(&self) -> StoreResult<Vec<String>>;
}

/// Facility store backed by the Neo4j HTTP transactional API.
pub struct Neo4jHttpStore {
    client: Neo4jHttpClient,
}

impl Neo4jHttpStore {
    pub fn new(client: Neo4jHttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FacilityStore for Neo4jHttpStore {
    async fn search(&self, filter: &SearchFilter, limit: u32) -> StoreResult<Vec<FacilityCandidate>> {
        let (query, params) = cypher::build_search_query(filter, limit);
        let rows = self.client.execute(&query, &params).await?;

        let mut facilities = Vec::with_capacity(rows.len());
        for mut row in rows {
            let node = row
                .remove("f")
                .ok_or_else(|| StoreError::Shape("row is missing the `f` column".into()))?;
            match serde_json::from_value::<FacilityCandidate>(node) {
                Ok(facility) => facilities.push(facility),
                Err(e) => {
                    // A single malformed node must not sink the result set.
                    tracing::warn!(error = %e, "skipping facility row with unexpected shape");
                }
            }
        }
        Ok(facilities)
    }

    async fn service_types(&self) -> StoreResult<Vec<String>> {
        let rows = self
            .client
            .execute(cypher::service_types_query(), &Map::new())
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                row.get("service_type")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GraphConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> Neo4jHttpStore {
        Neo4jHttpStore::new(Neo4jHttpClient::new(GraphConfig {
            http_url: server.uri(),
            database: "facilities".into(),
            timeout_secs: 2,
            ..GraphConfig::default()
        }))
    }

    fn facility_node(name: &str, service_type: &str) -> serde_json::Value {
        serde_json::json!({
            "name": name,
            "corporation_name": "社会福祉法人つばさ会",
            "service_type": service_type,
            "district": "八幡西区",
            "address": "北九州市八幡西区黒崎1-1-1",
            "phone": "093-000-0000",
        })
    }

    #[tokio::test]
    async fn search_maps_nodes_to_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/db/facilities/tx/commit"))
            .and(body_partial_json(serde_json::json!({
                "statements": [{"parameters": {"service_type": "短期入所", "limit": 20}}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "columns": ["f"],
                    "data": [
                        {"row": [facility_node("みんなのhome黒崎ショート", "短期入所")]},
                        {"row": [facility_node("やすらぎ荘", "短期入所")]},
                    ],
                }],
                "errors": [],
            })))
            .mount(&server)
            .await;

        let filter = SearchFilter {
            service_type: Some("短期入所".into()),
            ..SearchFilter::default()
        };
        let facilities = store_for(&server).search(&filter, 20).await.unwrap();
        assert_eq!(facilities.len(), 2);
        assert_eq!(facilities[0].name, "みんなのhome黒崎ショート");
        assert_eq!(facilities[0].service_type.as_deref(), Some("短期入所"));
    }

    #[tokio::test]
    async fn malformed_node_is_skipped_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/db/facilities/tx/commit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "columns": ["f"],
                    "data": [
                        {"row": [{"no_name_field": true}]},
                        {"row": [facility_node("やすらぎ荘", "短期入所")]},
                    ],
                }],
                "errors": [],
            })))
            .mount(&server)
            .await;

        let facilities = store_for(&server)
            .search(&SearchFilter::default(), 20)
            .await
            .unwrap();
        assert_eq!(facilities.len(), 1);
        assert_eq!(facilities[0].name, "やすらぎ荘");
    }

    #[tokio::test]
    async fn service_types_skips_nulls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/db/facilities/tx/commit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "columns": ["service_type"],
                    "data": [
                        {"row": [null]},
                        {"row": ["生活介護"]},
                        {"row": ["短期入所"]},
                    ],
                }],
                "errors": [],
            })))
            .mount(&server)
            .await;

        let types = store_for(&server).service_types().await.unwrap();
        assert_eq!(types, vec!["生活介護", "短期入所"]);
    }
}
