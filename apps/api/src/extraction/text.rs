// Plain-text resume decoding.

use super::ExtractionError;

/// Decodes bytes into a UTF-8 string using, in order: a BOM, the declared
/// `charset=` of the content type, then a chardetng guess.
/// Replacement characters during decoding are treated as corruption.
pub fn decode_to_utf8(bytes: &[u8], content_type: Option<&str>) -> Result<String, ExtractionError> {
    if let Some((enc, offset)) = encoding_rs::Encoding::for_bom(bytes) {
        let (cow, _used, had_errors) = enc.decode(&bytes[offset..]);
        if had_errors {
            return Err(ExtractionError::Decode(format!(
                "invalid {} after byte-order mark",
                enc.name()
            )));
        }
        return Ok(cow.into_owned());
    }

    if let Some(label) = charset_label(content_type) {
        if let Some(enc) = encoding_rs::Encoding::for_label_no_replacement(label.as_bytes()) {
            let (cow, _used, had_errors) = enc.decode(bytes);
            if had_errors {
                return Err(ExtractionError::Decode(format!(
                    "content is not valid for declared charset '{label}'"
                )));
            }
            return Ok(cow.into_owned());
        }
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    let (cow, _used, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(ExtractionError::Decode(format!(
            "content is not valid {}",
            enc.name()
        )));
    }
    Ok(cow.into_owned())
}

fn charset_label(content_type: Option<&str>) -> Option<String> {
    content_type?
        .split(';')
        .skip(1)
        .map(str::trim)
        .find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"').to_string())
        })
}
