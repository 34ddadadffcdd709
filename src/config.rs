//! Configuration types for PDF extraction.
//!
//! Every knob of a run lives in [`ExtractionConfig`], built through
//! [`ExtractionConfigBuilder`]. Defaults (model, timeouts, retry policy) are
//! applied here and by the CLI; the pipeline itself treats the values as
//! opaque inputs.

use crate::error::ExtractError;
use crate::pipeline::document::DocumentSource;
use crate::pipeline::vision::VisionModel;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration for one extraction run.
///
/// # Example
/// ```rust
/// use edgequake_pdf_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .output_dir("report_out")
///     .ai_enabled(false)
///     .cleanup(true)
///     .build()
///     .unwrap();
/// assert!(!config.ai_enabled);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Where to write output. `None` derives `<pdf_base_name>_extraction`.
    pub output_dir: Option<PathBuf>,

    /// Ask the vision model to describe each page image. Default: true.
    pub ai_enabled: bool,

    /// Delete the `images/` directory once the Markdown is written. Default: false.
    pub cleanup: bool,

    /// Vision model identifier, e.g. "gemini-2.0-flash", "gpt-4.1-mini".
    /// If None, uses [`DEFAULT_MODEL`] or the environment.
    pub model: Option<String>,

    /// Provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed vision client. Takes precedence over `provider`.
    pub vision: Option<Arc<dyn VisionModel>>,

    /// Document backend. If None, pages are read with pdfium.
    pub document_source: Option<Arc<dyn DocumentSource>>,

    /// Explicit pdfium shared library. Falls back to `PDFIUM_LIB_PATH`,
    /// then the system library.
    pub pdfium_library_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Longest edge, in pixels, of a rendered page image. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Sampling temperature for the vision call. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate per image. Default: 1024.
    pub max_tokens: usize,

    /// Retries on a failed vision call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-image vision call timeout in seconds, retries included. Default: 60.
    pub api_timeout_secs: u64,

    /// Vision calls allowed in flight at once. Default: 1 (strictly sequential).
    ///
    /// Results are always collected in page order regardless of this value.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Custom analysis prompt. If None, uses [`crate::prompts::ANALYSIS_PROMPT`].
    pub analysis_prompt: Option<String>,

    /// Receives per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            ai_enabled: true,
            cleanup: false,
            model: None,
            provider_name: None,
            provider: None,
            vision: None,
            document_source: None,
            pdfium_library_path: None,
            password: None,
            max_rendered_pixels: 2000,
            temperature: 0.1,
            max_tokens: 1024,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            concurrency: 1,
            download_timeout_secs: 120,
            analysis_prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("output_dir", &self.output_dir)
            .field("ai_enabled", &self.ai_enabled)
            .field("cleanup", &self.cleanup)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("vision", &self.vision.as_ref().map(|_| "<dyn VisionModel>"))
            .field(
                "document_source",
                &self.document_source.as_ref().map(|_| "<dyn DocumentSource>"),
            )
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = Some(dir.into());
        self
    }

    pub fn ai_enabled(mut self, v: bool) -> Self {
        self.config.ai_enabled = v;
        self
    }

    pub fn cleanup(mut self, v: bool) -> Self {
        self.config.cleanup = v;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn vision(mut self, vision: Arc<dyn VisionModel>) -> Self {
        self.config.vision = Some(vision);
        self
    }

    pub fn document_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.config.document_source = Some(source);
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn analysis_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.analysis_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(ExtractError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "API timeout must be at least 1 second".into(),
            ));
        }
        if matches!(c.output_dir.as_deref(), Some(p) if p.as_os_str().is_empty()) {
            return Err(ExtractError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
