//! Prompts sent to the vision model.
//!
//! Callers can override the default via
//! [`crate::config::ExtractionConfig::analysis_prompt`]; the constant here is
//! used only when no override is provided.

/// Default instruction sent alongside each page image.
///
/// The answer is parsed by [`crate::pipeline::analyze::parse_response`], which
/// expects exactly the three JSON fields named below.
pub const ANALYSIS_PROMPT: &str = r#"Analyze this image and provide:
1. A detailed description of what the image shows
2. The type of image (e.g., diagram, chart, photograph, illustration, screenshot, table)
3. A suggested caption for the image

Respond in JSON format:
{
  "description": "detailed description",
  "type": "image type",
  "caption": "suggested caption"
}"#;
