//! Document extraction: turns an uploaded resume into plain text.
//!
//! Flow: detect kind → PDF text layer / text decode / OCR → labelled page text.
//! Sectioning and chunking of the resulting text live in [`sections`].

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

pub mod ocr;
pub mod pdf;
pub mod sections;
pub mod text;

use self::ocr::OcrEngine;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to read PDF: {0}")]
    Pdf(String),

    #[error("Failed to decode text document: {0}")]
    Decode(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("OCR is disabled; image resumes cannot be processed")]
    OcrUnavailable,

    #[error("No text could be extracted from the document")]
    EmptyDocument,
}

/// Raster formats accepted for direct OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Tiff,
    Bmp,
    Gif,
    Webp,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Gif => "gif",
            ImageFormat::Webp => "webp",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "tif" | "tiff" => Some(ImageFormat::Tiff),
            "bmp" => Some(ImageFormat::Bmp),
            "gif" => Some(ImageFormat::Gif),
            "webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }
}

/// What kind of document an upload is. Decides the extraction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Image(ImageFormat),
}

impl DocumentKind {
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Text => "text",
            DocumentKind::Image(_) => "image",
        }
    }
}

impl Serialize for DocumentKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Detects the document kind from magic bytes, then content type, then file extension.
/// Returns `None` for anything the pipeline cannot read.
pub fn detect_kind(
    head: &[u8],
    content_type: Option<&str>,
    filename: Option<&str>,
) -> Option<DocumentKind> {
    if let Some(kind) = sniff_magic(head) {
        return Some(kind);
    }

    let content_type = content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();
    match content_type.as_str() {
        "application/pdf" => return Some(DocumentKind::Pdf),
        ct if ct.starts_with("text/") => return Some(DocumentKind::Text),
        ct if ct.starts_with("image/") => {
            if let Some(format) = ImageFormat::from_extension(&ct["image/".len()..]) {
                return Some(DocumentKind::Image(format));
            }
        }
        _ => {}
    }

    let extension = filename
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())?;
    match extension.as_str() {
        "pdf" => Some(DocumentKind::Pdf),
        "txt" | "text" | "md" | "markdown" => Some(DocumentKind::Text),
        other => ImageFormat::from_extension(other).map(DocumentKind::Image),
    }
}

fn sniff_magic(head: &[u8]) -> Option<DocumentKind> {
    if head.starts_with(b"%PDF-") {
        Some(DocumentKind::Pdf)
    } else if head.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(DocumentKind::Image(ImageFormat::Png))
    } else if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(DocumentKind::Image(ImageFormat::Jpeg))
    } else if head.starts_with(b"II*\0") || head.starts_with(b"MM\0*") {
        Some(DocumentKind::Image(ImageFormat::Tiff))
    } else if head.starts_with(b"BM") && head.len() >= 14 && head[6..10] == [0u8; 4] {
        Some(DocumentKind::Image(ImageFormat::Bmp))
    } else if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        Some(DocumentKind::Image(ImageFormat::Gif))
    } else if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"WEBP" {
        Some(DocumentKind::Image(ImageFormat::Webp))
    } else {
        None
    }
}

/// OCR output for one image on a page.
#[derive(Debug, Clone)]
pub struct OcrSegment {
    pub image_index: usize,
    pub text: String,
}

/// Text recovered from one page, from the text layer and from OCR.
#[derive(Debug, Clone, Default)]
pub struct PageText {
    pub number: usize,
    pub text: String,
    pub ocr: Vec<OcrSegment>,
}

#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub kind: DocumentKind,
    pub pages: Vec<PageText>,
    pub warnings: Vec<String>,
}

impl ExtractedDocument {
    pub fn ocr_segment_count(&self) -> usize {
        self.pages.iter().map(|p| p.ocr.len()).sum()
    }

    /// Joins every non-blank segment into one string.
    ///
    /// PDF and image pages are labelled `[Page N Text]` / `[Page N Image I OCR]`;
    /// plain text documents are passed through unlabelled.
    pub fn render_text(&self) -> String {
        if self.kind == DocumentKind::Text {
            return self
                .pages
                .iter()
                .map(|p| p.text.trim())
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join("\n\n");
        }

        let mut parts = Vec::new();
        for page in &self.pages {
            if !page.text.trim().is_empty() {
                parts.push(format!("[Page {} Text]\n{}", page.number, page.text.trim_end()));
            }
            for segment in &page.ocr {
                if !segment.text.trim().is_empty() {
                    parts.push(format!(
                        "[Page {} Image {} OCR]\n{}",
                        page.number,
                        segment.image_index,
                        segment.text.trim()
                    ));
                }
            }
        }
        parts.join("\n\n")
    }
}

/// Runs the extraction path for `kind` and returns the labelled pages.
///
/// OCR failures are recorded as warnings and never abort extraction. The call
/// fails with [`ExtractionError::EmptyDocument`] when nothing readable remains.
pub async fn extract_document(
    bytes: Bytes,
    kind: DocumentKind,
    content_type: Option<&str>,
    ocr: Option<&dyn OcrEngine>,
) -> Result<ExtractedDocument, ExtractionError> {
    let document = match kind {
        DocumentKind::Pdf => extract_pdf(bytes, ocr).await?,
        DocumentKind::Text => ExtractedDocument {
            kind,
            pages: vec![PageText {
                number: 1,
                text: text::decode_to_utf8(&bytes, content_type)?,
                ocr: vec![],
            }],
            warnings: vec![],
        },
        DocumentKind::Image(format) => {
            let engine = ocr.ok_or(ExtractionError::OcrUnavailable)?;
            let mut warnings = Vec::new();
            let mut page = PageText {
                number: 1,
                ..Default::default()
            };
            match engine.recognize(&bytes, format.extension()).await {
                Ok(text) => page.ocr.push(OcrSegment {
                    image_index: 1,
                    text,
                }),
                Err(e) => {
                    warn!("OCR of uploaded image failed: {e}");
                    warnings.push(format!("Page 1 Image 1 OCR failed: {e}"));
                }
            }
            ExtractedDocument {
                kind,
                pages: vec![page],
                warnings,
            }
        }
    };

    if document.render_text().trim().is_empty() {
        return Err(ExtractionError::EmptyDocument);
    }

    info!(
        kind = document.kind.label(),
        pages = document.pages.len(),
        ocr_segments = document.ocr_segment_count(),
        warnings = document.warnings.len(),
        "Document extracted"
    );

    Ok(document)
}

async fn extract_pdf(
    bytes: Bytes,
    ocr: Option<&dyn OcrEngine>,
) -> Result<ExtractedDocument, ExtractionError> {
    let scan_images = ocr.is_some();
    // pdf-extract is synchronous and can panic on malformed fonts.
    let content = tokio::task::spawn_blocking(move || pdf::read_pdf(&bytes, scan_images))
        .await
        .map_err(|e| ExtractionError::Pdf(format!("PDF parser aborted: {e}")))??;

    let mut warnings = content.warnings;
    let mut pages: Vec<PageText> = content
        .page_texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageText {
            number: i + 1,
            text,
            ocr: vec![],
        })
        .collect();

    if let Some(engine) = ocr {
        for image in content.images {
            let text = match engine.recognize(&image.bytes, image.extension).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(page = image.page, image = image.index, "OCR failed: {e}");
                    warnings.push(format!(
                        "Page {} Image {} OCR failed: {e}",
                        image.page, image.index
                    ));
                    continue;
                }
            };
            // The text layer and the image scan can disagree on page count.
            while pages.len() < image.page {
                let number = pages.len() + 1;
                pages.push(PageText {
                    number,
                    ..Default::default()
                });
            }
            pages[image.page - 1].ocr.push(OcrSegment {
                image_index: image.index,
                text,
            });
        }
    } else if pages.iter().all(|p| p.text.trim().is_empty()) {
        warnings.push("PDF has no text layer and OCR is disabled".to_string());
    }

    Ok(ExtractedDocument {
        kind: DocumentKind::Pdf,
        pages,
        warnings,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;

    use super::ocr::OcrEngine;
    use super::ExtractionError;

    /// OCR stub returning fixed text, or failing when `text` is `None`.
    pub struct StubOcr {
        pub text: Option<String>,
    }

    impl StubOcr {
        pub fn returning(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
            }
        }

        pub fn failing() -> Self {
            Self { text: None }
        }
    }

    #[async_trait]
    impl OcrEngine for StubOcr {
        async fn recognize(&self, _image: &[u8], _extension: &str) -> Result<String, ExtractionError> {
            self.text
                .clone()
                .ok_or_else(|| ExtractionError::Ocr("tesseract exited with status 1".into()))
        }
    }
}
