//! In-memory correlation between preview assets and full-quality sources.

pub mod correlation;

pub use correlation::{CorrelationStore, RecordSummary, SharedStore, DEFAULT_CAPACITY};
