//! Generation-model access for CareBridge.
//!
//! `OllamaClient` wraps the Ollama HTTP endpoint (single-turn, chat,
//! availability). `StructuredExtractor` is the single shared boundary that
//! turns unreliable free-text model output into validated JSON mappings;
//! every feature that wants structured output goes through it.

pub mod config;
pub mod error;
pub mod extract;
pub mod ollama;

pub use config::OllamaConfig;
pub use error::{LlmError, LlmResult};
pub use extract::{FieldKind, FieldSpec, KeyPolicy, StructuredExtractor};
pub use ollama::{ChatMessage, OllamaClient};
