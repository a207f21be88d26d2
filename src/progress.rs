//! Progress-callback trait for extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as a document moves through decode, model call and parse.
//!
//! # Example
//!
//! ```rust
//! use edgequake_claims::{ExtractionProgressCallback, ExtractionConfig};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ExtractionProgressCallback for Printer {
//!     fn on_pages_decoded(&self, page_count: usize) {
//!         eprintln!("{page_count} page(s) ready");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it processes a document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before the document is decoded.
    ///
    /// # Arguments
    /// * `name`: file name of the uploaded document
    /// * `mime_type`: declared MIME type
    fn on_document_start(&self, name: &str, mime_type: &str) {
        let _ = (name, mime_type);
    }

    /// Called after decoding, with the number of page images.
    fn on_pages_decoded(&self, page_count: usize) {
        let _ = page_count;
    }

    /// Called just before the model request is sent.
    ///
    /// # Arguments
    /// * `model`: model identifier
    /// * `image_count`: images attached to the request
    fn on_model_request(&self, model: &str, image_count: usize) {
        let _ = (model, image_count);
    }

    /// Called instead of [`Self::on_model_request`] when the record comes
    /// from the memoization cache.
    fn on_cache_hit(&self) {}

    /// Called once with the number of fields in the extracted record.
    fn on_extraction_complete(&self, field_count: usize) {
        let _ = field_count;
    }

    /// Called when any stage fails.
    ///
    /// # Arguments
    /// * `kind`: [`crate::ClaimsError::kind`] of the failure
    /// * `error`: human-readable error description
    fn on_error(&self, kind: &str, error: &str) {
        let _ = (kind, error);
    }
}

/// A no-op implementation for callers that need a callback value but no
/// events. Leaving the callback unset has the same effect.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        pages: AtomicUsize,
        requests: AtomicUsize,
        hits: AtomicUsize,
        errors: Mutex<Vec<String>>,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_pages_decoded(&self, page_count: usize) {
            self.pages.store(page_count, Ordering::SeqCst);
        }

        fn on_model_request(&self, _model: &str, _image_count: usize) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }

        fn on_cache_hit(&self) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, kind: &str, _error: &str) {
            self.errors.lock().unwrap().push(kind.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_document_start("claim.pdf", "application/pdf");
        cb.on_pages_decoded(2);
        cb.on_model_request("gemini-2.0-flash", 2);
        cb.on_cache_hit();
        cb.on_extraction_complete(48);
        cb.on_error("DecodeError", "bad bytes");
    }

    #[test]
    fn noop_callback_is_an_explicit_choice() {
        let unset = crate::config::ExtractionConfig::default();
        assert!(unset.progress_callback.is_none());

        let config = crate::config::ExtractionConfig::builder()
            .progress_callback(Arc::new(NoopProgressCallback))
            .build()
            .unwrap();
        assert!(config.progress_callback.is_some());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = Arc::new(TrackingCallback::default());
        let cb: ProgressCallback = tracker.clone();

        cb.on_pages_decoded(3);
        cb.on_model_request("m", 3);
        cb.on_cache_hit();
        cb.on_error("MalformedResponseError", "not json");

        assert_eq!(tracker.pages.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.requests.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.hits.load(Ordering::SeqCst), 1);
        assert_eq!(
            *tracker.errors.lock().unwrap(),
            vec!["MalformedResponseError".to_string()]
        );
    }
}
