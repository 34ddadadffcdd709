//! Pipeline stages for PDF extraction.
//!
//! Each submodule implements one step; the orchestration lives in
//! [`crate::extract`].
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ document ──▶ persist ──▶ analyze ──▶ markdown
//! (path/URL) (pdfium)    (PNG file)   (vision)
//! ```
//!
//! 1. [`input`]    resolve the user-supplied path or URL to a local PDF
//! 2. [`document`] the page source seam; [`pdfium`] is the production
//!    implementation and runs in `spawn_blocking`
//! 3. [`persist`]  PNG-encode each page image and write it under `images/`
//! 4. [`analyze`]  ask a [`vision::VisionModel`] about the stored image and
//!    parse the answer; the only stage with network I/O

pub mod analyze;
pub mod document;
pub mod input;
pub mod pdfium;
pub mod persist;
pub mod vision;
