//! pdfium-backed [`DocumentSource`]: page text and page rasters.
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and must not be driven from async code; the pipeline only ever calls
//! into this module from a `spawn_blocking` thread (see
//! [`crate::pipeline::document::spawn_page_reader`]).
//!
//! The page image is the whole page rendered to a bitmap, capped at
//! `max_rendered_pixels` on its longest edge so an A0 poster does not turn
//! into a 12,000 × 17,000 px allocation.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::DocumentInfo;
use crate::pipeline::document::{Document, DocumentSource};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Reads documents with pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumSource {
    library_path: Option<PathBuf>,
    password: Option<String>,
    max_rendered_pixels: u32,
}

impl PdfiumSource {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            library_path: config.pdfium_library_path.clone(),
            password: config.password.clone(),
            max_rendered_pixels: config.max_rendered_pixels,
        }
    }

    /// Bind pdfium: explicit path, then `PDFIUM_LIB_PATH`, then the system library.
    fn bind(&self) -> Result<Pdfium, ExtractError> {
        let explicit = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => {
                let path = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&path)
                } else {
                    path
                };
                debug!("Binding pdfium from {}", path.display());
                Pdfium::bind_to_library(&path)
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ExtractError::PdfiumBindingFailed(e.to_string()))?;

        Ok(Pdfium::new(bindings))
    }

    fn load<'a>(&'a self, pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, ExtractError> {
        let password = self.password.as_deref();
        pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| classify_open_error(path, password.is_some(), e))
    }
}

impl DocumentSource for PdfiumSource {
    fn open_with(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(&dyn Document) -> Result<(), ExtractError>,
    ) -> Result<(), ExtractError> {
        let pdfium = self.bind()?;
        let document = self.load(&pdfium, path)?;
        info!("PDF loaded: {} pages", document.pages().len());

        let render_config = PdfRenderConfig::new()
            .set_target_width(self.max_rendered_pixels as i32)
            .set_maximum_height(self.max_rendered_pixels as i32);

        let doc = PdfiumDocument {
            document: &document,
            render_config,
        };
        visit(&doc)
    }

    fn info(&self, path: &Path) -> Result<DocumentInfo, ExtractError> {
        let pdfium = self.bind()?;
        let document = self.load(&pdfium, path)?;
        let metadata = document.metadata();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(DocumentInfo {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            page_count: document.pages().len() as usize,
            pdf_version: format!("{:?}", document.version()),
        })
    }
}

struct PdfiumDocument<'d, 'p> {
    document: &'d PdfDocument<'p>,
    render_config: PdfRenderConfig,
}

impl Document for PdfiumDocument<'_, '_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&self, index: usize) -> Result<String, ExtractError> {
        let to_err = |e: PdfiumError| ExtractError::TextExtractionFailed {
            page: index + 1,
            detail: format!("{:?}", e),
        };
        let page = self.document.pages().get(index as u16).map_err(to_err)?;
        let text = page.text().map_err(to_err)?;
        Ok(text.all())
    }

    fn page_image(&self, index: usize) -> Result<Option<DynamicImage>, ExtractError> {
        let to_err = |e: PdfiumError| ExtractError::PageRenderFailed {
            page: index + 1,
            detail: format!("{:?}", e),
        };
        let page = self.document.pages().get(index as u16).map_err(to_err)?;
        let bitmap = page.render_with_config(&self.render_config).map_err(to_err)?;
        let image = bitmap.as_image();

        if image.width() == 0 || image.height() == 0 {
            return Ok(None);
        }
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(Some(image))
    }
}

/// Map a pdfium load failure to the matching open error.
fn classify_open_error(path: &Path, had_password: bool, e: PdfiumError) -> ExtractError {
    let detail = format!("{:?}", e);
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            ExtractError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            ExtractError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        ExtractError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}
