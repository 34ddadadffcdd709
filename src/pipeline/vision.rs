//! Vision service access: the [`VisionModel`] seam and its LLM-backed client.
//!
//! The analyzer only knows [`VisionModel`]: "send this prompt and this PNG,
//! give me back candidates made of parts". [`LlmVisionModel`] implements it on
//! top of any `edgequake_llm` provider and owns the transport concerns
//! (authentication via the provider, retries with exponential backoff).
//! Timeouts are applied by the caller so they also bound the retries.

use crate::config::{ExtractionConfig, DEFAULT_MODEL};
use crate::error::{AnalysisError, ExtractError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// One piece of a candidate answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    /// Anything that is not text (inline data, tool calls, ...).
    Other,
}

/// One alternative answer from the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    pub parts: Vec<ContentPart>,
}

/// Raw answer from a vision model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisionResponse {
    pub candidates: Vec<Candidate>,
}

impl VisionResponse {
    /// A response with one candidate holding one text part.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                parts: vec![ContentPart::Text(text.into())],
            }],
        }
    }
}

/// A model that can look at an image and answer a prompt about it.
pub trait VisionModel: Send + Sync {
    /// Provider/model label used in logs.
    fn name(&self) -> &str;

    /// Send `prompt` together with a PNG image in a single request.
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        image_png: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<VisionResponse, AnalysisError>> + Send + 'a>>;
}

/// [`VisionModel`] backed by an `edgequake_llm` provider.
pub struct LlmVisionModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl LlmVisionModel {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: &ExtractionConfig) -> Self {
        Self {
            provider,
            label: label.into(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        }
    }

    fn build_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

impl fmt::Debug for LlmVisionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmVisionModel")
            .field("label", &self.label)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl VisionModel for LlmVisionModel {
    fn name(&self) -> &str {
        &self.label
    }

    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        image_png: &'a [u8],
    ) -> Pin<Box<dyn Future<Output = Result<VisionResponse, AnalysisError>> + Send + 'a>> {
        Box::pin(async move {
            // `detail: "high"` keeps small print legible on tiled providers.
            let image = ImageData::new(STANDARD.encode(image_png), "image/png").with_detail("high");
            let messages = vec![ChatMessage::user_with_images(prompt, vec![image])];
            let options = self.build_options();

            let response = retry_with_backoff(self.max_retries, self.retry_backoff_ms, || {
                self.provider.chat(&messages, Some(&options))
            })
            .await
            .map_err(|e| AnalysisError::ServiceFailed {
                detail: e.to_string(),
            })?;

            debug!(
                "{}: {} input tokens, {} output tokens",
                self.label, response.prompt_tokens, response.completion_tokens
            );

            if response.content.is_empty() {
                return Ok(VisionResponse::default());
            }
            Ok(VisionResponse::from_text(response.content))
        })
    }
}

/// Run `op` until it succeeds or `max_retries` retries have failed.
///
/// The wait before retry `n` (1-based) is `backoff_ms * 2^(n-1)`.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_retries: u32,
    backoff_ms: u64,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_retries => {
                let backoff = backoff_ms.saturating_mul(2u64.saturating_pow(attempt));
                attempt += 1;
                warn!(
                    "Vision call failed: {}; retry {}/{} after {}ms",
                    e, attempt, max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Model used for a named provider when none is configured.
pub fn default_model_for(provider_name: &str) -> &'static str {
    match provider_name {
        "openai" | "azure" => "gpt-4.1-nano",
        "anthropic" => "claude-sonnet-4-20250514",
        _ => DEFAULT_MODEL,
    }
}

/// Resolve the vision client, from most-specific to least-specific:
///
/// 1. pre-built [`VisionModel`] (`config.vision`),
/// 2. pre-built provider (`config.provider`),
/// 3. named provider + model (`config.provider_name`),
/// 4. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`,
/// 5. `OPENAI_API_KEY`,
/// 6. `ProviderFactory::from_env()` auto-detection.
pub fn resolve_vision_model(config: &ExtractionConfig) -> Result<Arc<dyn VisionModel>, ExtractError> {
    if let Some(ref vision) = config.vision {
        return Ok(Arc::clone(vision));
    }

    let wrap = |provider: Arc<dyn LLMProvider>, label: String| -> Arc<dyn VisionModel> {
        Arc::new(LlmVisionModel::new(provider, label, config))
    };

    if let Some(ref provider) = config.provider {
        let label = config.model.clone().unwrap_or_else(|| "custom".to_string());
        return Ok(wrap(Arc::clone(provider), label));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| default_model_for(name).to_string());
        let provider = create_vision_provider(name, &model)?;
        return Ok(wrap(provider, format!("{name}/{model}")));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            let provider = create_vision_provider(&prov, &model)?;
            return Ok(wrap(provider, format!("{prov}/{model}")));
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| default_model_for("openai").to_string());
            let provider = create_vision_provider("openai", &model)?;
            return Ok(wrap(provider, format!("openai/{model}")));
        }
    }

    let (provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No vision provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY or ANTHROPIC_API_KEY, or pass --no-ai.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(wrap(provider, "auto".to_string()))
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ExtractError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Fixed;

    impl VisionModel for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn generate<'a>(
            &'a self,
            _prompt: &'a str,
            _image_png: &'a [u8],
        ) -> Pin<Box<dyn Future<Output = Result<VisionResponse, AnalysisError>> + Send + 'a>>
        {
            Box::pin(async { Ok(VisionResponse::from_text("{}")) })
        }
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry_with_backoff(3, 1, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(format!("503 on attempt {n}"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(2, 1, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("401 unauthorized".to_string()) }
        })
        .await;
        assert_eq!(result, Err("401 unauthorized".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn default_models_follow_provider() {
        assert_eq!(default_model_for("openai"), "gpt-4.1-nano");
        assert_eq!(default_model_for("gemini"), "gemini-2.0-flash");
        assert_eq!(default_model_for("ollama"), DEFAULT_MODEL);
    }

    #[test]
    fn prebuilt_vision_model_wins() {
        let vision: Arc<dyn VisionModel> = Arc::new(Fixed);
        let config = ExtractionConfig::builder()
            .vision(Arc::clone(&vision))
            .provider_name("openai")
            .build()
            .unwrap();
        let resolved = resolve_vision_model(&config).unwrap();
        assert!(Arc::ptr_eq(&resolved, &vision));
        assert_eq!(resolved.name(), "fixed");
    }

    #[test]
    fn from_text_builds_single_candidate() {
        let r = VisionResponse::from_text("hi");
        assert_eq!(r.candidates.len(), 1);
        assert_eq!(r.candidates[0].parts, vec![ContentPart::Text("hi".into())]);
    }
}
