//! File and display names for transferred assets.

use rand::Rng;
use tessera_types::{trailing_segment, Payload};

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 7;

/// Upload filename `asset_<unix-ms>_<7 base36 chars>.<ext>`.
pub fn asset_filename(payload: &Payload) -> String {
    format!(
        "asset_{}_{}.{}",
        chrono::Utc::now().timestamp_millis(),
        random_suffix(),
        payload.extension()
    )
}

/// Display name of a downloaded asset: the url's decoded trailing segment,
/// or `<prefix>_<unix-ms>` when there is none.
pub fn display_name(url: &str, fallback_prefix: &str) -> String {
    trailing_segment(url)
        .map(|segment| match urlencoding::decode(segment) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => segment.to_string(),
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("{fallback_prefix}_{}", chrono::Utc::now().timestamp_millis()))
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())] as char)
        .collect()
}
