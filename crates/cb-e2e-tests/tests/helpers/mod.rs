//! Shared test harness for E2E integration tests.
//!
//! Wires the real pipeline components against a wiremock Ollama endpoint
//! and the in-memory facility store, exercising real code paths across
//! all crate boundaries.

use std::sync::Arc;

use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cb_graph::{FacilityStore, MockFacilityStore};
use cb_llm::{OllamaClient, OllamaConfig, StructuredExtractor};
use cb_plan::{GoalGenerator, NeedsAnalyzer, ServiceCoordinator};
use cb_search::SearchPipeline;

/// Route component logs through the test writer; RUST_LOG controls the
/// filter. Safe to call from every test.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// End-to-end test harness: one mocked Ollama endpoint shared by every
/// component, plus the in-memory facility store.
pub struct TestHarness {
    /// Wiremock server standing in for Ollama.
    pub ollama: MockServer,
    /// Shared generation client pointed at the mock server.
    pub client: Arc<OllamaClient>,
    /// Facility store shared by search and coordination.
    pub store: Arc<dyn FacilityStore>,
}

impl TestHarness {
    /// Harness over the five-facility sample store.
    pub async fn with_sample_data() -> Self {
        Self::with_store(MockFacilityStore::with_sample_data()).await
    }

    /// Harness over a caller-supplied store.
    pub async fn with_store(store: MockFacilityStore) -> Self {
        init_tracing();
        let ollama = MockServer::start().await;
        let client = Arc::new(OllamaClient::new(OllamaConfig {
            base_url: ollama.uri(),
            timeout_secs: 2,
            ..OllamaConfig::default()
        }));
        Self {
            ollama,
            client,
            store: Arc::new(store),
        }
    }

    pub fn search_pipeline(&self) -> SearchPipeline {
        SearchPipeline::new(Arc::clone(&self.client), Arc::clone(&self.store))
    }

    pub fn needs_analyzer(&self) -> NeedsAnalyzer {
        NeedsAnalyzer::new(self.extractor())
    }

    pub fn goal_generator(&self) -> GoalGenerator {
        GoalGenerator::new(self.extractor())
    }

    pub fn service_coordinator(&self) -> ServiceCoordinator {
        ServiceCoordinator::new(self.extractor(), Arc::clone(&self.store))
    }

    fn extractor(&self) -> StructuredExtractor {
        StructuredExtractor::new(Arc::clone(&self.client))
    }

    /// Mount a generate-endpoint response for requests whose prompt
    /// contains `prompt_fragment`; stage discrimination for pipelines
    /// that call the model more than once.
    pub async fn mount_generate(&self, prompt_fragment: &str, content: &str) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_string_contains(prompt_fragment))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": content})),
            )
            .mount(&self.ollama)
            .await;
    }

    /// Mount a failing generate-endpoint response for matching prompts.
    pub async fn mount_generate_failure(&self, prompt_fragment: &str) {
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_string_contains(prompt_fragment))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.ollama)
            .await;
    }
}
