//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events while the pipeline walks the document. The library never prints
//! anything itself; the CLI turns these events into a progress bar.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf_extract::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter(AtomicUsize);
//!
//! impl ExtractionProgressCallback for PageCounter {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, _images: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(PageCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive in page order.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the document is open and its page count is known.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page's text is read.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `total_pages`: total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page's text and image (if any) have been handled.
    ///
    /// `images` is the number of images the page contributed (0 or 1).
    fn on_page_complete(&self, page_num: usize, total_pages: usize, images: usize) {
        let _ = (page_num, total_pages, images);
    }

    /// Called when a vision call failed and a fallback analysis was used.
    fn on_analysis_fallback(&self, page_num: usize, image_number: usize, error: &str) {
        let _ = (page_num, image_number, error);
    }

    /// Called when cleanup of the images directory starts.
    fn on_cleanup(&self) {}

    /// Called once the Markdown has been written.
    fn on_extraction_complete(&self, total_pages: usize, image_count: usize) {
        let _ = (total_pages, image_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
