//! Decoding of inline `data:` payloads.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tessera_types::{parse_content_type, Payload, DEFAULT_CONTENT_TYPE};

use crate::error::InlineError;

pub const INLINE_SCHEME: &str = "data:";

const BASE64_MARKER: &str = ";base64";

/// Whether `s` is an inline payload (`data:...`).
pub fn is_inline(s: &str) -> bool {
    s.starts_with(INLINE_SCHEME)
}

/// Decode `data:[<mediatype>][;base64],<data>` into a payload.
///
/// An omitted media type means `text/plain;charset=US-ASCII`; a header made
/// only of parameters (`data:;charset=utf-8,...`) applies them to
/// `text/plain`. The data part is percent-decoded first, then base64-decoded
/// when the header carries the `;base64` marker.
pub fn decode_inline(uri: &str) -> Result<Payload, InlineError> {
    let rest = uri.strip_prefix(INLINE_SCHEME).ok_or(InlineError::NotInline)?;
    let (header, data) = rest.split_once(',').ok_or(InlineError::MissingSeparator)?;

    let (media, is_base64) = split_base64_marker(header);
    let content_type: Cow<'_, str> = if media.is_empty() {
        Cow::Borrowed(DEFAULT_CONTENT_TYPE)
    } else if media.starts_with(';') {
        Cow::Owned(format!("text/plain{media}"))
    } else {
        Cow::Borrowed(media)
    };
    parse_content_type(&content_type).map_err(|e| InlineError::MediaType(e.to_string()))?;

    let raw = urlencoding::decode_binary(data.as_bytes());
    let bytes = if is_base64 {
        let compact: Vec<u8> = raw.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect();
        STANDARD
            .decode(compact)
            .map_err(|e| InlineError::Base64(e.to_string()))?
    } else {
        raw.into_owned()
    };

    Ok(Payload::new(bytes, content_type.into_owned()))
}

fn split_base64_marker(header: &str) -> (&str, bool) {
    let cut = header.len().saturating_sub(BASE64_MARKER.len());
    match header.get(cut..) {
        Some(tail) if tail.eq_ignore_ascii_case(BASE64_MARKER) => (&header[..cut], true),
        _ => (header, false),
    }
}
