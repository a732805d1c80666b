//! Shared data model for the CareBridge extraction & retrieval core.
//!
//! Everything here is ephemeral: constructed per request, never mutated
//! after construction, and handed to the persistence/API layer which maps
//! it to stored records. List fields always deserialize to an empty `Vec`
//! rather than being absent, so consumers never branch on nullability.

pub mod goals;
pub mod needs;
pub mod score;
pub mod search;
pub mod services;

pub use goals::*;
pub use needs::*;
pub use score::clamp_score;
pub use search::*;
pub use services::*;
