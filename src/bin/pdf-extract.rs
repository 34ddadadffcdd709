//! CLI binary for edgequake-pdf-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, prints the result record as JSON on stdout and keeps
//! everything human-facing on stderr.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf_extract::{
    extract, inspect, ExtractionConfig, ExtractionProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently being processed.
    page_started: Mutex<Option<Instant>>,
    fallbacks: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_extraction_start` reports the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            fallbacks: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn page_elapsed(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, images: usize) {
        let elapsed = self.page_elapsed();
        let image_note = if images == 0 {
            "no image".to_string()
        } else {
            format!("{images} image")
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            page_num,
            total,
            dim(&image_note),
            dim(&format!("{elapsed:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_analysis_fallback(&self, page_num: usize, image_number: usize, error: &str) {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3} image {}  {}",
            yellow("⚠"),
            page_num,
            image_number,
            yellow(&msg),
        ));
    }

    fn on_cleanup(&self) {
        self.bar.set_message("removing images…");
    }

    fn on_extraction_complete(&self, total_pages: usize, image_count: usize) {
        self.bar.finish_and_clear();
        let fallbacks = self.fallbacks.load(Ordering::SeqCst);
        if fallbacks == 0 {
            eprintln!(
                "{} {} pages, {} images extracted",
                green("✔"),
                bold(&total_pages.to_string()),
                bold(&image_count.to_string())
            );
        } else {
            eprintln!(
                "{} {} pages, {} images extracted  ({} without analysis)",
                yellow("⚠"),
                bold(&total_pages.to_string()),
                bold(&image_count.to_string()),
                yellow(&fallbacks.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract into ./report_extraction/
  pdf-extract report.pdf

  # Choose the output directory
  pdf-extract report.pdf -o out/

  # Text and images only, no vision model
  pdf-extract --no-ai report.pdf

  # Keep only the Markdown
  pdf-extract --cleanup report.pdf

  # Use a specific provider and model
  pdf-extract --provider openai --model gpt-4.1-mini report.pdf

  # Print PDF metadata (no API key needed)
  pdf-extract --inspect-only report.pdf

OUTPUT:
  <output_dir>/extracted_content.md
  <output_dir>/images/page_<P>_image_<N>.png   (removed with --cleanup)
  The result record is printed as JSON on stdout.

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
"#;

/// Extract text and page images from a PDF into Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-extract",
    version,
    about = "Extract text and page images from a PDF into Markdown",
    long_about = "Extract the text of every page of a PDF, save one image per page, \
describe each image with a vision model (Gemini, OpenAI, Anthropic, Ollama, ...) \
and assemble everything into a Markdown file.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Output directory (default: <pdf name>_extraction).
    #[arg(short, long, env = "PDF_EXTRACT_OUTPUT")]
    output: Option<PathBuf>,

    /// Vision model ID (e.g. gemini-2.0-flash, gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Vision provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "Vision provider. Auto-detected from API key env vars if not set.\n\
          Supported: gemini, openai, anthropic, azure, ollama."
    )]
    provider: Option<String>,

    /// Remove the images directory after the Markdown is written.
    #[arg(long, env = "PDF_EXTRACT_CLEANUP")]
    cleanup: bool,

    /// Skip vision analysis; images are still saved.
    #[arg(long, env = "PDF_EXTRACT_NO_AI")]
    no_ai: bool,

    /// Number of vision calls allowed in flight.
    #[arg(short, long, env = "PDF_EXTRACT_CONCURRENCY", default_value_t = 1,
          value_parser = clap::value_parser!(u16).range(1..=32))]
    concurrency: u16,

    /// Per-image vision call timeout in seconds.
    #[arg(long, env = "PDF_EXTRACT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds (URL inputs).
    #[arg(long, env = "PDF_EXTRACT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_EXTRACT_PASSWORD")]
    password: Option<String>,

    /// Path to libpdfium (overrides PDFIUM_LIB_PATH).
    #[arg(long)]
    pdfium: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "PDF_EXTRACT_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_EXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the JSON result.
    #[arg(short, long, env = "PDF_EXTRACT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; -v always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
        );
        return Ok(());
    }

    // ── Run extraction ───────────────────────────────────────────────────
    let started = Instant::now();
    let result = extract(&cli.input, &config)
        .await
        .with_context(|| format!("Extraction of {} failed", cli.input))?;

    let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
    println!("{json}");

    if !cli.quiet {
        for warning in &result.warnings {
            eprintln!("{} {}", yellow("warning:"), warning);
        }
        eprintln!(
            "{}  {} images  {}ms  →  {}",
            green("✔"),
            result.images.len(),
            started.elapsed().as_millis(),
            bold(&result.markdown_file.display().to_string()),
        );
        if !config.cleanup && !result.images.is_empty() {
            eprintln!(
                "   {}",
                dim(&format!(
                    "images in {}",
                    result.output_dir.join("images").display()
                ))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .ai_enabled(!cli.no_ai)
        .cleanup(cli.cleanup)
        .concurrency(usize::from(cli.concurrency))
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref dir) = cli.output {
        builder = builder.output_dir(dir);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref path) = cli.pdfium {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
