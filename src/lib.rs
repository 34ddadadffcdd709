//! # edgequake-pdf-extract
//!
//! Extract the text and page images of a PDF into a Markdown document, with
//! each image described by a vision model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    resolve local file or download from URL
//!  ├─ 2. Open     pdfium, on a blocking thread (spawn_blocking)
//!  ├─ 3. Pages    text appended in order; page image → images/page_P_image_N.png
//!  ├─ 4. Analyze  vision model → description / type / caption (never fatal)
//!  ├─ 5. Render   extracted_content.md
//!  └─ 6. Cleanup  optional removal of images/
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf_extract::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / ANTHROPIC_API_KEY
//!     let config = ExtractionConfig::default();
//!     let result = extract("report.pdf", &config).await?;
//!     println!("{}", result.markdown_file.display());
//!     for warning in &result.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Without a vision provider, turn analysis off:
//!
//! ```rust,no_run
//! # use edgequake_pdf_extract::{extract_sync, ExtractionConfig};
//! let config = ExtractionConfig::builder().ai_enabled(false).build()?;
//! let result = extract_sync("report.pdf", &config)?;
//! # Ok::<(), edgequake_pdf_extract::ExtractError>(())
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-extract` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! ## Testing Without pdfium
//!
//! Both external dependencies sit behind traits:
//! [`DocumentSource`] for the PDF backend and [`VisionModel`] for the vision
//! service. Inject either through [`ExtractionConfigBuilder`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{AnalysisError, ExtractError, ExtractionWarning};
pub use extract::{extract, extract_sync, inspect};
pub use output::{AnalysisOutcome, DocumentInfo, ExtractionResult, ImageAnalysis};
pub use pipeline::document::{Document, DocumentSource};
pub use pipeline::vision::{Candidate, ContentPart, VisionModel, VisionResponse};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
