//! Result types handed back to callers.
//!
//! [`ExtractionResult`] is the only contract between the library and any
//! presentation layer: the CLI prints it as JSON, other callers may log it or
//! ignore it entirely.

use crate::error::ExtractionWarning;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Description used for images when AI analysis was turned off.
pub const DESCRIPTION_SKIPPED: &str = "AI analysis skipped";
/// Description used for images whose vision call failed.
pub const DESCRIPTION_UNAVAILABLE: &str = "Image analysis unavailable";
/// Type used when the kind of image is not known.
pub const TYPE_UNKNOWN: &str = "unknown";
/// Type used for images that were not analysed.
pub const TYPE_IMAGE: &str = "image";

/// How the description of one image was obtained.
///
/// Renderers match on the variant; the flat string view only exists for the
/// serialized record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// The vision model answered with the expected three fields.
    Analyzed {
        description: String,
        kind: String,
        caption: String,
    },
    /// The vision model answered, but not with a parseable structure.
    Unparsed { raw_text: String },
    /// AI analysis was disabled for this run.
    Skipped,
    /// The vision call failed; `reason` is for logs only.
    Unavailable { reason: String },
}

/// Analysis of one page image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "ImageRecord")]
pub struct ImageAnalysis {
    /// Where the PNG was written.
    pub image_path: PathBuf,
    /// 1-indexed page the image was taken from.
    pub page_number: usize,
    /// 1-indexed, document-wide sequence number.
    pub image_number: usize,
    pub outcome: AnalysisOutcome,
}

impl ImageAnalysis {
    pub fn new(
        image_path: PathBuf,
        page_number: usize,
        image_number: usize,
        outcome: AnalysisOutcome,
    ) -> Self {
        Self {
            image_path,
            page_number,
            image_number,
            outcome,
        }
    }

    pub fn description(&self) -> &str {
        match &self.outcome {
            AnalysisOutcome::Analyzed { description, .. } => description,
            AnalysisOutcome::Unparsed { raw_text } => raw_text,
            AnalysisOutcome::Skipped => DESCRIPTION_SKIPPED,
            AnalysisOutcome::Unavailable { .. } => DESCRIPTION_UNAVAILABLE,
        }
    }

    /// The image classification (`type` in the serialized record).
    pub fn kind(&self) -> &str {
        match &self.outcome {
            AnalysisOutcome::Analyzed { kind, .. } => kind,
            AnalysisOutcome::Skipped => TYPE_IMAGE,
            AnalysisOutcome::Unparsed { .. } | AnalysisOutcome::Unavailable { .. } => TYPE_UNKNOWN,
        }
    }

    pub fn caption(&self) -> &str {
        match &self.outcome {
            AnalysisOutcome::Analyzed { caption, .. } => caption,
            _ => "",
        }
    }
}

/// Flat wire form of [`ImageAnalysis`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRecord {
    pub image_path: String,
    pub page_number: usize,
    pub image_number: usize,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub caption: String,
}

impl From<ImageAnalysis> for ImageRecord {
    fn from(a: ImageAnalysis) -> Self {
        Self {
            image_path: a.image_path.to_string_lossy().into_owned(),
            page_number: a.page_number,
            image_number: a.image_number,
            description: a.description().to_string(),
            kind: a.kind().to_string(),
            caption: a.caption().to_string(),
        }
    }
}

/// Final output of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// The rendered Markdown document.
    pub markdown: String,
    /// Every page's text in page order, each followed by a blank line.
    pub text: String,
    /// One entry per page image, in discovery order.
    pub images: Vec<ImageAnalysis>,
    pub output_dir: PathBuf,
    pub markdown_file: PathBuf,
    pub pdf_name: String,
    /// Non-fatal problems seen during the run.
    #[serde(skip)]
    pub warnings: Vec<ExtractionWarning>,
}

/// Document-level information returned by [`crate::extract::inspect`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}
