//! Progress-callback trait for run, document and page events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::TranslationConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through each document.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf_translate::{TranslationConfig, TranslationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     translated: AtomicUsize,
//! }
//!
//! impl TranslationProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
//!         self.translated.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} translated ({} bytes)", page_num, total_pages, text_len);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     translated: AtomicUsize::new(0),
//! });
//!
//! let config = TranslationConfig::builder()
//!     .target_language("Italian")
//!     .progress_callback(counter as Arc<dyn TranslationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Called by the pipeline as it processes documents and pages.
///
/// Events are informational only; nothing a callback does changes what the
/// pipeline does next. All methods default to no-ops. Page numbers are
/// 1-indexed.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called once before the first document, with the number of documents.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called after a document has been parsed.
    fn on_document_start(&self, path: &Path, total_pages: usize) {
        let _ = (path, total_pages);
    }

    /// Called just before a page's text is sent for translation.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a failed attempt, before sleeping `delay`.
    ///
    /// # Arguments
    /// * `attempt`: 1-indexed number of the attempt that just failed
    fn on_page_retry(&self, page_num: usize, attempt: u32, delay: Duration, error: &str) {
        let _ = (page_num, attempt, delay, error);
    }

    /// Called when a page has been translated and composed.
    ///
    /// # Arguments
    /// * `text_len`: byte length of the translated text
    fn on_page_complete(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when a page is left out of the output.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once the output document has been written.
    fn on_document_complete(&self, output: &Path, translated_pages: usize, total_pages: usize) {
        let _ = (output, translated_pages, total_pages);
    }

    /// Called when a document could not be read or its output not written.
    fn on_document_error(&self, path: &Path, error: &str) {
        let _ = (path, error);
    }
}

/// A no-op implementation, the default when no callback is configured.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TranslationConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        delays: Mutex<Vec<Duration>>,
    }

    impl TranslationProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_retry(&self, _page_num: usize, _attempt: u32, delay: Duration, _error: &str) {
            self.delays.lock().unwrap().push(delay);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _text_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_document_start(Path::new("a.pdf"), 5);
        cb.on_page_start(1, 5);
        cb.on_page_retry(1, 1, Duration::from_secs(2), "overloaded");
        cb.on_page_complete(1, 5, 42);
        cb.on_page_error(2, 5, "some error");
        cb.on_document_complete(Path::new("out/translated_a.pdf"), 4, 5);
        cb.on_document_error(Path::new("b.pdf"), "corrupt");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_page_start(1, 3);
        tracker.on_page_complete(1, 3, 100);
        tracker.on_page_start(2, 3);
        tracker.on_page_retry(2, 1, Duration::from_millis(10), "timeout");
        tracker.on_page_error(2, 3, "timeout");
        tracker.on_page_start(3, 3);
        tracker.on_page_complete(3, 3, 80);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.delays.lock().unwrap(), vec![Duration::from_millis(10)]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(1);
        cb.on_page_start(1, 10);
    }
}
