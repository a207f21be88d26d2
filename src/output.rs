//! Result types returned by [`crate::extract::Extractor::process`].

use crate::record::ExtractedRecord;
use serde::Serialize;
use std::sync::Arc;

/// The outcome of processing one uploaded document.
#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    /// File name of the processed document.
    pub document: String,
    /// The extracted record, shared with the memoization cache.
    pub record: Arc<ExtractedRecord>,
    /// Number of page images sent (or that would have been sent) to the model.
    pub page_count: usize,
    /// True when the record came from the memoization cache.
    pub from_cache: bool,
    pub stats: ExtractionStats,
}

/// Timing and token usage for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    /// Input tokens reported by the model (0 on a cache hit).
    pub input_tokens: u64,
    /// Output tokens reported by the model (0 on a cache hit).
    pub output_tokens: u64,
    pub decode_duration_ms: u64,
    /// Time spent in the model call (0 on a cache hit).
    pub model_duration_ms: u64,
    pub total_duration_ms: u64,
}
