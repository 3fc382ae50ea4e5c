use mime::Mime;

use crate::error::{TypeError, TypeResult};

/// Content type assumed for inline encodings that do not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain;charset=US-ASCII";

/// Parse and validate a content-type tag.
///
/// Accepts anything of the form `type/subtype[;params]` where both halves
/// are non-empty. Wildcards (`*/*`, `image/*`) are rejected since they do not
/// describe a concrete payload.
pub fn parse_content_type(value: &str) -> TypeResult<Mime> {
    let invalid = |reason: &str| TypeError::InvalidContentType {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if value.trim().is_empty() {
        return Err(invalid("empty"));
    }
    let parsed: Mime = value
        .trim()
        .parse()
        .map_err(|e: mime::FromStrError| invalid(&e.to_string()))?;
    if parsed.type_() == mime::STAR || parsed.subtype() == mime::STAR {
        return Err(invalid("wildcard"));
    }
    Ok(parsed)
}

/// File extension derived from a content type: its subtype, or `bin` when
/// the tag cannot be parsed.
///
/// `image/svg+xml` yields `svg`; parameters are ignored.
pub fn extension_for(content_type: &str) -> String {
    match parse_content_type(content_type) {
        Ok(m) => m.subtype().as_str().to_ascii_lowercase(),
        Err(_) => "bin".to_string(),
    }
}
