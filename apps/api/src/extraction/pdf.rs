//! PDF reading: per-page text via pdf-extract, embedded images via lopdf.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::ExtractionError;

/// Inherited-resource lookups stop after this many `/Parent` hops.
const MAX_PARENT_DEPTH: usize = 16;

/// An embedded image ready to hand to the OCR binary.
#[derive(Debug, Clone)]
pub struct PdfImage {
    /// 1-based page number.
    pub page: usize,
    /// 1-based position of the image on its page.
    pub index: usize,
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

#[derive(Debug, Default)]
pub struct PdfContent {
    pub page_texts: Vec<String>,
    pub images: Vec<PdfImage>,
    pub warnings: Vec<String>,
}

/// Reads the text layer of every page and, when `scan_images` is set, the
/// images embedded in each page's resources.
pub fn read_pdf(bytes: &[u8], scan_images: bool) -> Result<PdfContent, ExtractionError> {
    let page_texts = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    let mut content = PdfContent {
        page_texts,
        ..Default::default()
    };

    if scan_images {
        match Document::load_mem(bytes) {
            Ok(doc) => collect_images(&doc, &mut content),
            Err(e) => content
                .warnings
                .push(format!("Could not scan PDF for images: {e}")),
        }
    }

    debug!(
        pages = content.page_texts.len(),
        images = content.images.len(),
        "PDF read"
    );

    Ok(content)
}

fn collect_images(doc: &Document, content: &mut PdfContent) {
    for (page_number, page_id) in doc.get_pages() {
        let page = page_number as usize;
        let Some(xobjects) = page_xobjects(doc, page_id) else {
            continue;
        };

        let mut index = 0;
        for (name, obj) in xobjects.iter() {
            let Object::Stream(stream) = deref(doc, obj) else {
                continue;
            };
            if !is_image(&stream.dict) {
                continue;
            }
            index += 1;

            match encode_image(stream) {
                Ok((bytes, extension)) => content.images.push(PdfImage {
                    page,
                    index,
                    bytes,
                    extension,
                }),
                Err(reason) => {
                    let name = String::from_utf8_lossy(name);
                    debug!(page, image = %name, "Skipping image: {reason}");
                    content
                        .warnings
                        .push(format!("Page {page} Image {index} skipped: {reason}"));
                }
            }
        }
    }
}

/// Resolves `/Resources /XObject` for a page, following `/Parent` for inherited resources.
fn page_xobjects(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(resources) = node.get(b"Resources") {
            let resources = deref(doc, resources).as_dict().ok()?;
            return deref(doc, resources.get(b"XObject").ok()?).as_dict().ok();
        }
        let parent = node.get(b"Parent").ok()?;
        node = deref(doc, parent).as_dict().ok()?;
    }
    None
}

fn deref<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn is_image(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image")
}

fn filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(n)) => vec![n.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| match o {
                Object::Name(n) => Some(n.clone()),
                _ => None,
            })
            .collect(),
        _ => vec![],
    }
}

fn get_int(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    dict.get(key).ok().and_then(|o| o.as_i64().ok())
}

/// Produces a file tesseract can read: JPEG and JPEG 2000 streams as-is,
/// 8-bit gray/RGB raw samples wrapped in a PNM header.
fn encode_image(stream: &lopdf::Stream) -> Result<(Vec<u8>, &'static str), String> {
    let filters = filters(&stream.dict);
    match filters.iter().map(Vec::as_slice).collect::<Vec<_>>().as_slice() {
        [b"DCTDecode"] => return Ok((stream.content.clone(), "jpg")),
        [b"JPXDecode"] => return Ok((stream.content.clone(), "jp2")),
        [] | [b"FlateDecode"] => {}
        other => {
            let names: Vec<String> = other
                .iter()
                .map(|n| String::from_utf8_lossy(n).into_owned())
                .collect();
            return Err(format!("unsupported filter chain {names:?}"));
        }
    }

    let width = get_int(&stream.dict, b"Width").ok_or("missing /Width")?;
    let height = get_int(&stream.dict, b"Height").ok_or("missing /Height")?;
    let bits = get_int(&stream.dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return Err(format!("{bits}-bit samples are not supported"));
    }

    let (magic, channels, extension) = match stream.dict.get(b"ColorSpace") {
        Ok(Object::Name(n)) if n == b"DeviceGray" => ("P5", 1, "pgm"),
        Ok(Object::Name(n)) if n == b"DeviceRGB" => ("P6", 3, "ppm"),
        _ => return Err("unsupported color space".to_string()),
    };

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| format!("could not inflate image: {e}"))?
    };

    if width <= 0 || height <= 0 {
        return Err(format!("invalid image dimensions {width}x{height}"));
    }
    let expected = width
        .checked_mul(height)
        .and_then(|px| px.checked_mul(channels))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or("image dimensions overflow")?;
    if samples.len() < expected {
        return Err(format!(
            "sample buffer has {} bytes, expected {expected} for {width}x{height}",
            samples.len()
        ));
    }

    let mut pnm = format!("{magic}\n{width} {height}\n255\n").into_bytes();
    pnm.extend_from_slice(&samples[..expected]);
    Ok((pnm, extension))
}
