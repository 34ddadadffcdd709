//! Document access: the seam between the pipeline and a PDF backend.
//!
//! A [`DocumentSource`] opens a file and lends the open [`Document`] to a
//! visitor for exactly the duration of one call, so the handle is released on
//! every exit path. PDF backends are blocking and usually not `Send`, so
//! [`spawn_page_reader`] runs the visitor on a `spawn_blocking` thread and
//! hands pages to the async side through a channel of capacity 1. Pages travel
//! in index order and at most one page is read ahead of the consumer.

use crate::error::ExtractError;
use crate::output::DocumentInfo;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// An open document.
pub trait Document {
    fn page_count(&self) -> usize;

    /// Plain text of the page at 0-based `index`.
    fn page_text(&self, index: usize) -> Result<String, ExtractError>;

    /// Raster image of the page at 0-based `index`. `Ok(None)` means the page
    /// has no image, which is not an error.
    fn page_image(&self, index: usize) -> Result<Option<DynamicImage>, ExtractError>;
}

/// Opens documents for the pipeline.
pub trait DocumentSource: Send + Sync {
    /// Open `path` and call `visit` with the document. The document is closed
    /// when this returns.
    fn open_with(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(&dyn Document) -> Result<(), ExtractError>,
    ) -> Result<(), ExtractError>;

    /// Document-level information. Backends with richer metadata override this.
    fn info(&self, path: &Path) -> Result<DocumentInfo, ExtractError> {
        let mut info = DocumentInfo::default();
        self.open_with(path, &mut |doc| {
            info.page_count = doc.page_count();
            Ok(())
        })?;
        Ok(info)
    }
}

/// One page, as read from the document.
#[derive(Debug)]
pub struct PageContent {
    /// 0-based page index.
    pub index: usize,
    pub text: String,
    pub image: Option<DynamicImage>,
}

/// Messages sent by the page reader, in this order: one `Opened`, then one
/// `Page` per page.
#[derive(Debug)]
pub enum PageEvent {
    Opened { page_count: usize },
    Page(PageContent),
}

/// Read every page of `doc` in ascending order and send it down `tx`.
///
/// A text failure ends the walk with that error. An image failure is logged
/// and the page is treated as having no image. If the receiver has gone away
/// the walk stops quietly.
pub fn send_pages(doc: &dyn Document, tx: &mpsc::Sender<PageEvent>) -> Result<(), ExtractError> {
    let page_count = doc.page_count();
    if tx.blocking_send(PageEvent::Opened { page_count }).is_err() {
        return Ok(());
    }

    for index in 0..page_count {
        let text = doc.page_text(index)?;
        let image = match doc.page_image(index) {
            Ok(image) => image,
            Err(e) => {
                warn!("Page {}: treated as having no image: {}", index + 1, e);
                None
            }
        };

        let page = PageContent { index, text, image };
        if tx.blocking_send(PageEvent::Page(page)).is_err() {
            debug!("Page reader stopped at page {}: consumer gone", index + 1);
            return Ok(());
        }
    }

    Ok(())
}

/// Open `path` on a blocking thread and stream its pages.
///
/// The returned handle resolves to the open/read error, if any; check it once
/// the receiver is exhausted.
pub fn spawn_page_reader(
    source: Arc<dyn DocumentSource>,
    path: PathBuf,
) -> (mpsc::Receiver<PageEvent>, JoinHandle<Result<(), ExtractError>>) {
    let (tx, rx) = mpsc::channel(1);
    let handle = tokio::task::spawn_blocking(move || {
        source.open_with(&path, &mut |doc| send_pages(doc, &tx))
    });
    (rx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    struct Pages(Vec<(Result<String, String>, bool)>);

    impl Document for Pages {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn page_text(&self, index: usize) -> Result<String, ExtractError> {
            self.0[index]
                .0
                .clone()
                .map_err(|detail| ExtractError::TextExtractionFailed {
                    page: index + 1,
                    detail,
                })
        }

        fn page_image(&self, index: usize) -> Result<Option<DynamicImage>, ExtractError> {
            Ok(self.0[index].1.then(|| {
                DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])))
            }))
        }
    }

    struct Source(Vec<(Result<String, String>, bool)>);

    impl DocumentSource for Source {
        fn open_with(
            &self,
            _path: &Path,
            visit: &mut dyn FnMut(&dyn Document) -> Result<(), ExtractError>,
        ) -> Result<(), ExtractError> {
            visit(&Pages(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn pages_arrive_in_order() {
        let source = Arc::new(Source(vec![
            (Ok("one".into()), true),
            (Ok("two".into()), false),
            (Ok("three".into()), true),
        ]));
        let (mut rx, handle) = spawn_page_reader(source, PathBuf::from("doc.pdf"));

        match rx.recv().await {
            Some(PageEvent::Opened { page_count }) => assert_eq!(page_count, 3),
            other => panic!("expected Opened, got {other:?}"),
        }
        let mut seen = Vec::new();
        while let Some(PageEvent::Page(p)) = rx.recv().await {
            seen.push((p.index, p.text, p.image.is_some()));
        }
        assert_eq!(
            seen,
            vec![
                (0, "one".to_string(), true),
                (1, "two".to_string(), false),
                (2, "three".to_string(), true)
            ]
        );
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn text_failure_ends_stream_with_error() {
        let source = Arc::new(Source(vec![
            (Ok("one".into()), false),
            (Err("broken content stream".into()), false),
            (Ok("three".into()), false),
        ]));
        let (mut rx, handle) = spawn_page_reader(source, PathBuf::from("doc.pdf"));

        let mut pages = 0;
        while let Some(event) = rx.recv().await {
            if matches!(event, PageEvent::Page(_)) {
                pages += 1;
            }
        }
        assert_eq!(pages, 1);
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ExtractError::TextExtractionFailed { page: 2, .. }));
    }

    #[test]
    fn default_info_reports_page_count() {
        let source = Source(vec![(Ok("a".into()), false), (Ok("b".into()), false)]);
        let info = source.info(Path::new("doc.pdf")).unwrap();
        assert_eq!(info.page_count, 2);
    }
}
