//! Facility retrieval against the external graph store.
//!
//! The pipeline only ever issues read-only, parameterized filter queries;
//! schema management belongs to the excluded persistence layer. The
//! `FacilityStore` trait is the seam: production uses `Neo4jHttpStore`,
//! tests use `MockFacilityStore`.

pub mod client;
pub mod cypher;
pub mod error;
pub mod mock;
pub mod store;

pub use client::{GraphConfig, Neo4jHttpClient};
pub use error::{StoreError, StoreResult};
pub use mock::MockFacilityStore;
pub use store::{FacilityStore, Neo4jHttpStore};
