use crate::error::{StoreError, StoreResult};

/// Storage key for `name` placed below an optional path hint.
///
/// `storage_key("a.png", Some("campaign-7/"))` is `campaign-7/a.png`.
pub fn storage_key(name: &str, path_hint: Option<&str>) -> StoreResult<String> {
    let key = match path_hint.map(|h| h.trim_matches('/')).filter(|h| !h.is_empty()) {
        Some(hint) => format!("{hint}/{name}"),
        None => name.to_string(),
    };
    validate_key(&key)?;
    Ok(key)
}

/// Reject keys that are empty, absolute, or escape the store root.
pub fn validate_key(key: &str) -> StoreResult<()> {
    let invalid = |reason: &str| StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    };

    if key.is_empty() {
        return Err(invalid("empty"));
    }
    if key.starts_with('/') || key.contains('\\') {
        return Err(invalid("must be a relative forward-slash path"));
    }
    for segment in key.split('/') {
        match segment {
            "" => return Err(invalid("empty path segment")),
            "." | ".." => return Err(invalid("relative path segment")),
            _ => {}
        }
    }
    Ok(())
}
