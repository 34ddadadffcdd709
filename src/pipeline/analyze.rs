//! Image analysis: turn a persisted page image into an [`AnalysisOutcome`].
//!
//! The analyzer never fails. Whatever happens on the way to the vision
//! model (disabled AI, unreadable file, transport error, timeout, empty or
//! malformed answer) ends up as one of the outcome variants, and the caller
//! decides how loudly to report it.

use crate::error::AnalysisError;
use crate::output::AnalysisOutcome;
use crate::pipeline::vision::{ContentPart, VisionModel, VisionResponse};
use crate::prompts::ANALYSIS_PROMPT;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Shape the vision model is asked to answer in.
#[derive(Debug, Deserialize)]
struct AnalysisReply {
    #[serde(default)]
    description: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    caption: String,
}

/// Analyzes page images, with or without a vision model.
#[derive(Clone)]
pub struct ImageAnalyzer {
    vision: Option<Arc<dyn VisionModel>>,
    prompt: Arc<str>,
    timeout: Duration,
}

impl ImageAnalyzer {
    /// An analyzer that calls `vision` for every image.
    pub fn new(vision: Arc<dyn VisionModel>, prompt: Option<&str>, timeout: Duration) -> Self {
        Self {
            vision: Some(vision),
            prompt: Arc::from(prompt.unwrap_or(ANALYSIS_PROMPT)),
            timeout,
        }
    }

    /// An analyzer for runs with AI analysis turned off.
    pub fn disabled() -> Self {
        Self {
            vision: None,
            prompt: Arc::from(ANALYSIS_PROMPT),
            timeout: Duration::ZERO,
        }
    }

    /// Analyze the image stored at `image_path`.
    ///
    /// Returns the outcome together with the service error that forced a
    /// fallback, if any.
    pub async fn analyze(&self, image_path: &Path) -> (AnalysisOutcome, Option<AnalysisError>) {
        let Some(vision) = self.vision.as_ref() else {
            return (AnalysisOutcome::Skipped, None);
        };

        match self.call(vision.as_ref(), image_path).await {
            Ok(text) => (parse_response(&text), None),
            Err(e) => (
                AnalysisOutcome::Unavailable {
                    reason: e.to_string(),
                },
                Some(e),
            ),
        }
    }

    async fn call(&self, vision: &dyn VisionModel, image_path: &Path) -> Result<String, AnalysisError> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|e| AnalysisError::ReadFailed {
                detail: e.to_string(),
            })?;

        debug!("Analyzing {} with {}", image_path.display(), vision.name());
        let response = tokio::time::timeout(self.timeout, vision.generate(&self.prompt, &bytes))
            .await
            .map_err(|_| AnalysisError::Timeout {
                secs: self.timeout.as_secs(),
            })??;

        extract_response_text(&response)
    }
}

/// Concatenate the text parts of the first candidate, in order.
pub fn extract_response_text(response: &VisionResponse) -> Result<String, AnalysisError> {
    let candidate = response
        .candidates
        .first()
        .filter(|c| !c.parts.is_empty())
        .ok_or(AnalysisError::EmptyResponse)?;

    Ok(candidate
        .parts
        .iter()
        .filter_map(|p| match p {
            ContentPart::Text(t) => Some(t.as_str()),
            ContentPart::Other => None,
        })
        .collect())
}

static RE_FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```(?:json)?[ \t]*\r?\n").unwrap());
static RE_FENCE_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n?```$").unwrap());

/// Remove a leading ```` ```json ```` / ```` ``` ```` line and a trailing
/// ```` ``` ````, each on its own, then trim.
pub fn strip_code_fences(text: &str) -> String {
    let text = RE_FENCE_OPEN.replace(text.trim(), "");
    let text = RE_FENCE_CLOSE.replace(&text, "");
    text.trim().to_string()
}

/// Interpret a raw model answer.
///
/// A JSON object is taken verbatim as the three fields (missing ones empty);
/// anything else, arrays included, keeps the whole cleaned text as an
/// unparsed description.
pub fn parse_response(raw: &str) -> AnalysisOutcome {
    let cleaned = strip_code_fences(raw);
    match parse_reply(&cleaned) {
        Ok(reply) => AnalysisOutcome::Analyzed {
            description: reply.description,
            kind: reply.kind,
            caption: reply.caption,
        },
        Err(e) => {
            debug!("Vision reply is not structured JSON: {}", e);
            AnalysisOutcome::Unparsed { raw_text: cleaned }
        }
    }
}

fn parse_reply(cleaned: &str) -> Result<AnalysisReply, serde_json::Error> {
    // Derived `Deserialize` also accepts sequences; only objects count.
    match serde_json::from_str::<Value>(cleaned)? {
        object @ Value::Object(_) => serde_json::from_value(object),
        _ => Err(serde::de::Error::invalid_type(
            serde::de::Unexpected::Other("non-object JSON value"),
            &"a JSON object",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::vision::Candidate;
    use std::future::Future;
    use std::pin::Pin;

    #[test]
    fn strips_json_tagged_fence() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        let raw = "  ```\n{\"a\": 1}\n```  \n";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_leading_fence_without_closing_one() {
        let raw = "```json\n{\"description\": \"A cat\"}";
        assert_eq!(strip_code_fences(raw), "{\"description\": \"A cat\"}");
        assert_eq!(
            parse_response(raw),
            AnalysisOutcome::Analyzed {
                description: "A cat".into(),
                kind: String::new(),
                caption: String::new(),
            }
        );
    }

    #[test]
    fn strips_trailing_fence_without_opening_one() {
        let raw = "{\"type\": \"diagram\"}\n```";
        assert_eq!(strip_code_fences(raw), "{\"type\": \"diagram\"}");
        assert!(matches!(parse_response(raw), AnalysisOutcome::Analyzed { .. }));
    }

    #[test]
    fn arrays_are_not_structured_replies() {
        assert_eq!(
            parse_response("[]"),
            AnalysisOutcome::Unparsed {
                raw_text: "[]".into()
            }
        );
        assert_eq!(
            parse_response("[\"a\",\"b\",\"c\"]"),
            AnalysisOutcome::Unparsed {
                raw_text: "[\"a\",\"b\",\"c\"]".into()
            }
        );
    }

    #[test]
    fn non_object_json_is_unparsed() {
        assert!(matches!(parse_response("42"), AnalysisOutcome::Unparsed { .. }));
        assert!(matches!(
            parse_response("\"just a string\""),
            AnalysisOutcome::Unparsed { .. }
        ));
        assert!(matches!(
            parse_response("{\"description\": 5}"),
            AnalysisOutcome::Unparsed { .. }
        ));
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences("  plain answer \n"), "plain answer");
    }

    #[test]
    fn parses_three_fields_verbatim() {
        let raw = "```json\n{\"description\": \"A cat\", \"type\": \"photograph\", \"caption\": \"A cat sitting\"}\n```";
        assert_eq!(
            parse_response(raw),
            AnalysisOutcome::Analyzed {
                description: "A cat".into(),
                kind: "photograph".into(),
                caption: "A cat sitting".into(),
            }
        );
    }

    #[test]
    fn missing_fields_default_to_empty() {
        assert_eq!(
            parse_response("{\"type\": \"chart\"}"),
            AnalysisOutcome::Analyzed {
                description: String::new(),
                kind: "chart".into(),
                caption: String::new(),
            }
        );
    }

    #[test]
    fn malformed_reply_keeps_cleaned_text() {
        let raw = "```\nThis is a bar chart of revenue.\n```";
        assert_eq!(
            parse_response(raw),
            AnalysisOutcome::Unparsed {
                raw_text: "This is a bar chart of revenue.".into()
            }
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let response = VisionResponse {
            candidates: vec![
                Candidate {
                    parts: vec![
                        ContentPart::Text("{\"description\":".into()),
                        ContentPart::Other,
                        ContentPart::Text(" \"x\"}".into()),
                    ],
                },
                Candidate {
                    parts: vec![ContentPart::Text("ignored".into())],
                },
            ],
        };
        assert_eq!(
            extract_response_text(&response).unwrap(),
            "{\"description\": \"x\"}"
        );
    }

    #[test]
    fn empty_response_is_an_error() {
        assert_eq!(
            extract_response_text(&VisionResponse::default()),
            Err(AnalysisError::EmptyResponse)
        );
        let no_parts = VisionResponse {
            candidates: vec![Candidate::default()],
        };
        assert_eq!(extract_response_text(&no_parts), Err(AnalysisError::EmptyResponse));
    }

    struct Slow;

    impl VisionModel for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn generate<'a>(
            &'a self,
            _prompt: &'a str,
            _image_png: &'a [u8],
        ) -> Pin<Box<dyn Future<Output = Result<VisionResponse, AnalysisError>> + Send + 'a>>
        {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(VisionResponse::from_text("{}"))
            })
        }
    }

    #[tokio::test]
    async fn disabled_analyzer_skips() {
        let (outcome, err) = ImageAnalyzer::disabled().analyze(Path::new("nowhere.png")).await;
        assert_eq!(outcome, AnalysisOutcome::Skipped);
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn timeout_falls_back_to_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_1_image_1.png");
        std::fs::write(&path, b"png").unwrap();

        let analyzer = ImageAnalyzer::new(Arc::new(Slow), None, Duration::from_millis(20));
        let (outcome, err) = analyzer.analyze(&path).await;
        assert!(matches!(outcome, AnalysisOutcome::Unavailable { .. }));
        assert!(matches!(err, Some(AnalysisError::Timeout { .. })));
    }

    #[tokio::test]
    async fn unreadable_image_falls_back_to_unavailable() {
        let analyzer = ImageAnalyzer::new(Arc::new(Slow), None, Duration::from_secs(1));
        let (outcome, err) = analyzer.analyze(Path::new("/definitely/missing.png")).await;
        assert!(matches!(outcome, AnalysisOutcome::Unavailable { .. }));
        assert!(matches!(err, Some(AnalysisError::ReadFailed { .. })));
    }
}
