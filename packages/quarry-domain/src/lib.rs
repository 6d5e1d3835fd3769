//! Pure query interpretation stages: lexical normalization, temporal extraction, routing, and
//! the result contracts shared with the ranking stage.
//!
//! Nothing in this crate performs I/O or reads a clock. Temporal extraction takes the reference
//! instant from the caller.

pub mod normalize;
pub mod results;
pub mod routing;
pub mod temporal;
pub mod time_serde;

pub use normalize::{ProcessedQuery, normalize};
pub use results::{AskNotesResult, EnhancedSearchResult, MatchType, Note, SearchResult};
pub use routing::should_use_llm;
pub use temporal::{TemporalFilter, extract_temporal};
