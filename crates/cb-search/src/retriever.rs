//! Facility retrieval over the graph store.

use std::sync::Arc;

use cb_graph::FacilityStore;
use cb_protocol::{FacilityCandidate, SearchFilter};

/// How many facilities a search returns when the caller has no opinion.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Thin retrieval layer: runs the filter against the store and absorbs
/// store failures into an empty result set.
pub struct Retriever {
    store: Arc<dyn FacilityStore>,
}

impl Retriever {
    pub fn new(store: Arc<dyn FacilityStore>) -> Self {
        Self { store }
    }

    pub async fn search(&self, filter: &SearchFilter, limit: u32) -> Vec<FacilityCandidate> {
        match self.store.search(filter, limit).await {
            Ok(facilities) => {
                tracing::debug!(count = facilities.len(), "facility search complete");
                facilities
            }
            Err(e) => {
                tracing::warn!(error = %e, "facility store unavailable, returning no results");
                Vec::new()
            }
        }
    }
}
