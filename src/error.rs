//! Error types for the edgequake-pdf-extract library.
//!
//! Three types cover the three severities a run can hit:
//!
//! * [`ExtractError`] is **fatal**: the run cannot continue (document cannot
//!   be opened, a page's text cannot be read, an image or the Markdown file
//!   cannot be written). Returned as `Err(ExtractError)` from
//!   [`crate::extract::extract`]; no result record is produced.
//!
//! * [`AnalysisError`] is **non-fatal**: the vision service could not describe
//!   one image. Caught inside the analyzer and turned into a fallback
//!   [`crate::output::AnalysisOutcome::Unavailable`].
//!
//! * [`ExtractionWarning`] is what the caller gets to see of non-fatal
//!   problems. Collected in [`crate::output::ExtractionResult::warnings`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf-extract library.
///
/// Every message names the stage that failed so the CLI can print it as-is.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a file path nor an HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Open errors ───────────────────────────────────────────────────────
    /// The document could not be opened.
    #[error("Failed to open PDF '{path}': {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Extraction errors ─────────────────────────────────────────────────
    /// Output directory (or its `images/` subdirectory) could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Text layer of a page could not be read.
    #[error("Failed to extract text from page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// A page could not be rendered to a bitmap.
    #[error("Failed to render page {page}: {detail}")]
    PageRenderFailed { page: usize, detail: String },

    /// A page image could not be PNG-encoded.
    #[error("Failed to encode image from page {page}: {detail}")]
    ImageEncodeFailed { page: usize, detail: String },

    /// A page image could not be written to disk.
    #[error("Failed to write image file '{path}': {source}")]
    ImageWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rendered Markdown could not be written.
    #[error("Failed to write markdown file '{path}': {source}")]
    MarkdownWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Vision provider errors ────────────────────────────────────────────
    /// AI analysis is enabled but no provider could be set up.
    #[error("Vision provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why the vision service produced no usable answer for one image.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// The persisted image could not be read back.
    #[error("failed to read image: {detail}")]
    ReadFailed { detail: String },

    /// The service call itself failed (transport, auth, quota, ...).
    #[error("failed to generate content: {detail}")]
    ServiceFailed { detail: String },

    /// The service did not answer within the configured timeout.
    #[error("vision call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The service answered without any candidate or text content.
    #[error("no response from vision model")]
    EmptyResponse,
}

/// A non-fatal problem observed during a run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionWarning {
    /// Vision analysis failed; a fallback analysis was used for the image.
    #[error("AI analysis failed for {image_name} (page {page}): {error}")]
    AnalysisFallback {
        page: usize,
        image_number: usize,
        image_name: String,
        error: AnalysisError,
    },

    /// The images directory could not be removed after the run.
    #[error("Failed to clean up images in '{path}': {detail}")]
    CleanupFailed { path: PathBuf, detail: String },
}
