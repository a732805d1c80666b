//! The end-to-end search pipeline: analyze → retrieve → compose.

use std::sync::Arc;

use cb_graph::FacilityStore;
use cb_llm::{OllamaClient, StructuredExtractor};
use cb_protocol::SearchOutcome;

use crate::composer::AnswerComposer;
use crate::retriever::{DEFAULT_SEARCH_LIMIT, Retriever};
use crate::understanding::QueryUnderstanding;

/// Runs a facility question through all three stages and bundles the
/// intermediate artifacts into one outcome.
pub struct SearchPipeline {
    understanding: QueryUnderstanding,
    retriever: Retriever,
    composer: AnswerComposer,
    limit: u32,
}

impl SearchPipeline {
    pub fn new(client: Arc<OllamaClient>, store: Arc<dyn FacilityStore>) -> Self {
        Self {
            understanding: QueryUnderstanding::new(StructuredExtractor::new(Arc::clone(&client))),
            retriever: Retriever::new(store),
            composer: AnswerComposer::new(client),
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub async fn search(&self, query: &str) -> SearchOutcome {
        tracing::info!(query, "facility search started");
        let filter = self.understanding.analyze(query).await;
        let facilities = self.retriever.search(&filter, self.limit).await;
        let answer = self.composer.compose(query, &facilities).await;
        tracing::info!(count = facilities.len(), "facility search finished");

        SearchOutcome {
            query: query.to_string(),
            answer,
            facility_count: facilities.len(),
            facilities,
            filter,
            generated_at: chrono::Utc::now(),
        }
    }
}
