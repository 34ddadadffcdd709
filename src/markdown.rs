//! Markdown assembly.
//!
//! [`render`] is a pure function of its inputs: same text, images and name
//! give byte-identical output. Lines that would only carry a placeholder
//! (skipped or failed analysis, unknown type, empty caption) are left out.

use crate::output::{AnalysisOutcome, ImageAnalysis, TYPE_UNKNOWN};
use std::fmt::Write;

/// Render the extracted document.
///
/// ```rust
/// let md = edgequake_pdf_extract::markdown::render("Hello\n\n", &[], "doc.pdf");
/// assert!(md.starts_with("# Extracted Content from doc.pdf\n\n## Text Content\n\nHello"));
/// assert!(!md.contains("## Images"));
/// ```
pub fn render(full_text: &str, images: &[ImageAnalysis], document_name: &str) -> String {
    let mut md = String::new();

    let _ = write!(md, "# Extracted Content from {document_name}\n\n");

    md.push_str("## Text Content\n\n");
    md.push_str(full_text);
    md.push_str("\n\n");

    if !images.is_empty() {
        md.push_str("## Images\n\n");
        for image in images {
            write_image_entry(&mut md, image);
        }
    }

    md
}

fn write_image_entry(md: &mut String, image: &ImageAnalysis) {
    let _ = write!(
        md,
        "### Page {} - Image {}\n\n![{}]({})\n\n",
        image.page_number,
        image.image_number,
        image.caption(),
        image.image_path.display()
    );

    if let Some(kind) = visible_kind(&image.outcome) {
        let _ = write!(md, "**Type:** {kind}\n\n");
    }
    if let Some(description) = visible_description(&image.outcome) {
        let _ = write!(md, "**Description:** {description}\n\n");
    }
    let caption = image.caption();
    if !caption.is_empty() {
        let _ = write!(md, "**Caption:** {caption}\n\n");
    }

    md.push_str("---\n\n");
}

fn visible_kind(outcome: &AnalysisOutcome) -> Option<&str> {
    match outcome {
        AnalysisOutcome::Analyzed { kind, .. } if !kind.is_empty() && kind != TYPE_UNKNOWN => {
            Some(kind)
        }
        AnalysisOutcome::Skipped => Some(crate::output::TYPE_IMAGE),
        _ => None,
    }
}

fn visible_description(outcome: &AnalysisOutcome) -> Option<&str> {
    match outcome {
        AnalysisOutcome::Analyzed { description, .. } if !description.is_empty() => {
            Some(description)
        }
        AnalysisOutcome::Unparsed { raw_text } if !raw_text.is_empty() => Some(raw_text),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn image(page: usize, number: usize, outcome: AnalysisOutcome) -> ImageAnalysis {
        ImageAnalysis::new(
            PathBuf::from(format!("out/images/page_{page}_image_{number}.png")),
            page,
            number,
            outcome,
        )
    }

    fn analyzed(description: &str, kind: &str, caption: &str) -> AnalysisOutcome {
        AnalysisOutcome::Analyzed {
            description: description.into(),
            kind: kind.into(),
            caption: caption.into(),
        }
    }

    #[test]
    fn full_entry_layout() {
        let md = render(
            "Hello\n\n",
            &[image(1, 1, analyzed("A cat", "photograph", "A cat sitting"))],
            "cats.pdf",
        );
        let expected = "# Extracted Content from cats.pdf\n\n\
## Text Content\n\nHello\n\n\n\n\
## Images\n\n\
### Page 1 - Image 1\n\n\
![A cat sitting](out/images/page_1_image_1.png)\n\n\
**Type:** photograph\n\n\
**Description:** A cat\n\n\
**Caption:** A cat sitting\n\n\
---\n\n";
        assert_eq!(md, expected);
    }

    #[test]
    fn no_images_no_images_section() {
        let md = render("Hello\n\n", &[], "doc.pdf");
        assert!(md.contains("## Text Content\n\nHello"));
        assert!(!md.contains("## Images"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let images = vec![
            image(1, 1, analyzed("d", "diagram", "c")),
            image(2, 2, AnalysisOutcome::Skipped),
        ];
        assert_eq!(render("t", &images, "x.pdf"), render("t", &images, "x.pdf"));
    }

    #[test]
    fn unknown_type_is_suppressed() {
        let md = render("", &[image(1, 1, analyzed("d", "unknown", ""))], "x.pdf");
        assert!(!md.contains("**Type:**"));
        let md = render("", &[image(1, 1, analyzed("d", "diagram", ""))], "x.pdf");
        assert!(md.contains("**Type:** diagram"));
    }

    #[test]
    fn empty_type_and_caption_are_suppressed() {
        let md = render("", &[image(1, 1, analyzed("d", "", ""))], "x.pdf");
        assert!(!md.contains("**Type:**"));
        assert!(!md.contains("**Caption:**"));
        assert!(md.contains("![](out/images/page_1_image_1.png)"));
    }

    #[test]
    fn skipped_shows_type_but_no_description() {
        let md = render("", &[image(1, 1, AnalysisOutcome::Skipped)], "x.pdf");
        assert!(md.contains("**Type:** image"));
        assert!(!md.contains("**Description:**"));
        assert!(!md.contains("AI analysis skipped"));
    }

    #[test]
    fn unavailable_shows_nothing_but_link() {
        let outcome = AnalysisOutcome::Unavailable {
            reason: "quota exceeded".into(),
        };
        let md = render("", &[image(1, 1, outcome)], "x.pdf");
        assert!(!md.contains("**Type:**"));
        assert!(!md.contains("**Description:**"));
        assert!(!md.contains("Image analysis unavailable"));
        assert!(md.contains("---\n\n"));
    }

    #[test]
    fn unparsed_shows_raw_text_as_description() {
        let outcome = AnalysisOutcome::Unparsed {
            raw_text: "A chart.".into(),
        };
        let md = render("", &[image(1, 1, outcome)], "x.pdf");
        assert!(md.contains("**Description:** A chart.\n\n"));
        assert!(!md.contains("**Type:**"));
    }

    #[test]
    fn model_text_matching_placeholder_is_still_content() {
        let md = render(
            "",
            &[image(1, 1, analyzed("AI analysis skipped", "image", ""))],
            "x.pdf",
        );
        assert!(md.contains("**Description:** AI analysis skipped"));
    }

    #[test]
    fn entries_follow_input_order() {
        let images = vec![
            image(1, 1, analyzed("first", "a", "")),
            image(3, 2, analyzed("second", "b", "")),
        ];
        let md = render("", &images, "x.pdf");
        let first = md.find("### Page 1 - Image 1").unwrap();
        let second = md.find("### Page 3 - Image 2").unwrap();
        assert!(first < second);
    }
}
