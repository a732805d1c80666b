//! Natural-language facility search: query understanding → retrieval →
//! grounded answer composition.
//!
//! Every stage has a deterministic fallback, so a search request always
//! produces an answer — degraded when the model or the store is down,
//! never an error.

pub mod composer;
pub mod pipeline;
pub mod retriever;
pub mod synonyms;
pub mod understanding;

pub use composer::{AnswerComposer, NO_RESULTS_MESSAGE};
pub use pipeline::SearchPipeline;
pub use retriever::{DEFAULT_SEARCH_LIMIT, Retriever};
pub use understanding::QueryUnderstanding;
