//! Extraction entry points: the full run from input path to result record.
//!
//! One run is strictly ordered: open the document, create the output
//! directories, walk the pages in ascending order (text, then image: persist
//! and analyze), render the Markdown, write it, optionally remove the images,
//! return the [`ExtractionResult`]. Any fatal error stops the run and no
//! result is returned; files already written stay on disk.

use crate::config::ExtractionConfig;
use crate::error::{AnalysisError, ExtractError, ExtractionWarning};
use crate::markdown;
use crate::output::{DocumentInfo, ExtractionResult, ImageAnalysis};
use crate::pipeline::analyze::ImageAnalyzer;
use crate::pipeline::document::{self, DocumentSource, PageEvent};
use crate::pipeline::pdfium::PdfiumSource;
use crate::pipeline::{input, persist, vision};
use crate::progress::ProgressCallback;
use futures::stream::{FuturesOrdered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

/// Name of the Markdown file written inside the output directory.
pub const MARKDOWN_FILE_NAME: &str = "extracted_content.md";
/// Name of the image subdirectory inside the output directory.
pub const IMAGES_DIR_NAME: &str = "images";
/// Suffix appended to the PDF base name when no output directory is given.
pub const OUTPUT_DIR_SUFFIX: &str = "_extraction";

/// Extract a PDF file or URL into Markdown plus page images.
///
/// # Errors
/// Returns `Err(ExtractError)` only for fatal errors:
/// - input missing, unreadable or not a PDF; document cannot be opened
/// - AI enabled but no vision provider can be configured
/// - output directory cannot be created
/// - a page's text cannot be extracted
/// - an image or the Markdown file cannot be written
///
/// Failed vision calls and a failed cleanup are not errors; they show up in
/// [`ExtractionResult::warnings`].
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, ExtractError> {
    let start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_name = resolved.file_name();

    // ── Step 2: Vision model ─────────────────────────────────────────────
    let analyzer = if config.ai_enabled {
        let vision = vision::resolve_vision_model(config)?;
        info!("Using vision model: {}", vision.name());
        ImageAnalyzer::new(
            vision,
            config.analysis_prompt.as_deref(),
            Duration::from_secs(config.api_timeout_secs),
        )
    } else {
        info!("AI analysis disabled");
        ImageAnalyzer::disabled()
    };

    // ── Step 3: Open document ────────────────────────────────────────────
    let (mut pages, reader) =
        document::spawn_page_reader(document_source(config), resolved.path().to_path_buf());
    let total_pages = match pages.recv().await {
        Some(PageEvent::Opened { page_count }) => page_count,
        _ => return Err(reader_failure(reader).await),
    };
    info!("Opened {}: {} pages", pdf_name, total_pages);

    // ── Step 4: Output directories ───────────────────────────────────────
    let output_dir = resolve_output_dir(config.output_dir.as_deref(), &resolved.base_name());
    let images_dir = output_dir.join(IMAGES_DIR_NAME);
    tokio::fs::create_dir_all(&images_dir)
        .await
        .map_err(|e| ExtractError::OutputDirFailed {
            path: images_dir.clone(),
            source: e,
        })?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_start(total_pages);
    }

    // ── Step 5: Pages ────────────────────────────────────────────────────
    let processed = process_pages(
        &mut pages,
        reader,
        total_pages,
        &images_dir,
        &analyzer,
        config,
    )
    .await?;
    let PagesOutput {
        text,
        images,
        mut warnings,
    } = processed;

    // ── Step 6: Markdown ─────────────────────────────────────────────────
    let markdown = markdown::render(&text, &images, &pdf_name);
    let markdown_file = output_dir.join(MARKDOWN_FILE_NAME);
    tokio::fs::write(&markdown_file, &markdown)
        .await
        .map_err(|e| ExtractError::MarkdownWriteFailed {
            path: markdown_file.clone(),
            source: e,
        })?;
    debug!("Wrote {}", markdown_file.display());

    // ── Step 7: Cleanup ──────────────────────────────────────────────────
    if config.cleanup {
        if let Some(ref cb) = config.progress_callback {
            cb.on_cleanup();
        }
        if let Err(w) = cleanup_images(&images_dir).await {
            warn!("{}", w);
            warnings.push(w);
        }
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_extraction_complete(total_pages, images.len());
    }
    info!(
        "Extraction complete: {} pages, {} images, {} warnings, {}ms",
        total_pages,
        images.len(),
        warnings.len(),
        start.elapsed().as_millis()
    );

    Ok(ExtractionResult {
        markdown,
        text,
        images,
        output_dir,
        markdown_file,
        pdf_name,
        warnings,
    })
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Read document information without extracting anything.
///
/// Does not require a vision provider or API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<DocumentInfo, ExtractError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let source = document_source(config);
    let path = resolved.path().to_path_buf();

    tokio::task::spawn_blocking(move || source.info(&path))
        .await
        .map_err(|e| ExtractError::Internal(format!("Inspect task panicked: {}", e)))?
}

/// The output directory: `explicit`, or `<base_name>_extraction`.
pub fn resolve_output_dir(explicit: Option<&Path>, base_name: &str) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from(format!("{base_name}{OUTPUT_DIR_SUFFIX}")),
    }
}

/// Remove the images directory and everything in it.
///
/// Failure is reported as a warning; it never fails the run.
pub async fn cleanup_images(images_dir: &Path) -> Result<(), ExtractionWarning> {
    info!("Cleaning up image files in {}", images_dir.display());
    tokio::fs::remove_dir_all(images_dir)
        .await
        .map_err(|e| ExtractionWarning::CleanupFailed {
            path: images_dir.to_path_buf(),
            detail: e.to_string(),
        })
}

// ── Internal helpers ─────────────────────────────────────────────────────

struct PagesOutput {
    text: String,
    images: Vec<ImageAnalysis>,
    warnings: Vec<ExtractionWarning>,
}

fn document_source(config: &ExtractionConfig) -> Arc<dyn DocumentSource> {
    match config.document_source {
        Some(ref source) => Arc::clone(source),
        None => Arc::new(PdfiumSource::new(config)),
    }
}

/// Error of a page reader that stopped early.
async fn reader_failure(reader: JoinHandle<Result<(), ExtractError>>) -> ExtractError {
    match reader.await {
        Ok(Err(e)) => e,
        Ok(Ok(())) => ExtractError::Internal("document reader stopped unexpectedly".into()),
        Err(e) => ExtractError::Internal(format!("Document reader panicked: {}", e)),
    }
}

/// Walk every page in order.
///
/// Image numbers are handed out as pages arrive, so they follow page order.
/// Each analysis runs as its own task, so it makes progress while later pages
/// are read. At most `config.concurrency` analyses are pending at once; the
/// ordered queue yields their results in submission order.
async fn process_pages(
    pages: &mut mpsc::Receiver<PageEvent>,
    reader: JoinHandle<Result<(), ExtractError>>,
    total_pages: usize,
    images_dir: &Path,
    analyzer: &ImageAnalyzer,
    config: &ExtractionConfig,
) -> Result<PagesOutput, ExtractError> {
    let callback = config.progress_callback.as_ref();
    let mut out = PagesOutput {
        text: String::new(),
        images: Vec::new(),
        warnings: Vec::new(),
    };
    let mut pending = FuturesOrdered::new();
    let mut image_counter = 0usize;
    let mut pages_seen = 0usize;

    while let Some(event) = pages.recv().await {
        let PageEvent::Page(page) = event else {
            continue;
        };
        let page_num = page.index + 1;
        debug!("Processing page {}/{}", page_num, total_pages);
        if let Some(cb) = callback {
            cb.on_page_start(page_num, total_pages);
        }

        out.text.push_str(&page.text);
        out.text.push_str("\n\n");

        let mut page_images = 0;
        if let Some(image) = page.image {
            image_counter += 1;
            let path = persist::persist_image(&image, images_dir, page_num, image_counter).await?;
            pending.push_back(tokio::spawn(analyze_image(
                analyzer.clone(),
                path,
                page_num,
                image_counter,
            )));
            page_images = 1;

            while pending.len() >= config.concurrency {
                match pending.next().await {
                    Some(joined) => {
                        record_analysis(joined_analysis(joined)?, &mut out, callback)
                    }
                    None => break,
                }
            }
        }

        if let Some(cb) = callback {
            cb.on_page_complete(page_num, total_pages, page_images);
        }
        pages_seen += 1;
    }

    match reader.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e),
        Err(e) => {
            return Err(ExtractError::Internal(format!(
                "Document reader panicked: {}",
                e
            )))
        }
    }
    if pages_seen != total_pages {
        return Err(ExtractError::Internal(format!(
            "document reader delivered {} of {} pages",
            pages_seen, total_pages
        )));
    }

    while let Some(joined) = pending.next().await {
        record_analysis(joined_analysis(joined)?, &mut out, callback);
    }

    Ok(out)
}

async fn analyze_image(
    analyzer: ImageAnalyzer,
    path: PathBuf,
    page_num: usize,
    image_number: usize,
) -> AnalysisDone {
    let (outcome, error) = analyzer.analyze(&path).await;
    (
        ImageAnalysis::new(path, page_num, image_number, outcome),
        error,
    )
}

type AnalysisDone = (ImageAnalysis, Option<AnalysisError>);

fn joined_analysis(
    joined: Result<AnalysisDone, JoinError>,
) -> Result<AnalysisDone, ExtractError> {
    joined.map_err(|e| ExtractError::Internal(format!("Image analysis task panicked: {}", e)))
}

fn record_analysis(
    (analysis, error): AnalysisDone,
    out: &mut PagesOutput,
    callback: Option<&ProgressCallback>,
) {
    if let Some(error) = error {
        let image_name = persist::image_file_name(analysis.page_number, analysis.image_number);
        let warning = ExtractionWarning::AnalysisFallback {
            page: analysis.page_number,
            image_number: analysis.image_number,
            image_name,
            error,
        };
        warn!("{}", warning);
        if let Some(cb) = callback {
            cb.on_analysis_fallback(analysis.page_number, analysis.image_number, &warning.to_string());
        }
        out.warnings.push(warning);
    }
    out.images.push(analysis);
}
