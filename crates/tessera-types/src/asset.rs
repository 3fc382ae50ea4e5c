use serde::{Deserialize, Serialize};

/// Durable descriptor of an uploaded payload, as returned by the content
/// store. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermanentAsset {
    /// Public URL the asset can be fetched from.
    pub url: String,
    /// Store-side key (pathname) identifying the asset.
    pub storage_key: String,
    pub content_type: String,
    pub size: u64,
}

impl PermanentAsset {
    pub fn new(
        url: impl Into<String>,
        storage_key: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            url: url.into(),
            storage_key: storage_key.into(),
            content_type: content_type.into(),
            size,
        }
    }

    /// Trailing path segment of the url, without query or fragment.
    ///
    /// Returns `None` when the url ends in a slash or has no path.
    pub fn file_name(&self) -> Option<&str> {
        trailing_segment(&self.url)
    }
}

/// Trailing path segment of a url-like string, without query or fragment.
pub fn trailing_segment(url: &str) -> Option<&str> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
        None => without_query,
    };
    path.rsplit('/').next().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_camel_case() {
        let asset = PermanentAsset::new("https://store/a.png", "campaign/a.png", "image/png", 42);
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["storageKey"], "campaign/a.png");
        assert_eq!(json["contentType"], "image/png");
        assert_eq!(json["size"], 42);

        let back: PermanentAsset = serde_json::from_value(json).unwrap();
        assert_eq!(back, asset);
    }

    #[test]
    fn file_name_strips_query() {
        let asset = PermanentAsset::new("https://store/c/a.png?download=1", "c/a.png", "image/png", 1);
        assert_eq!(asset.file_name(), Some("a.png"));
    }

    #[test]
    fn trailing_segment_edge_cases() {
        assert_eq!(trailing_segment("https://store/"), None);
        assert_eq!(trailing_segment("https://store"), None);
        assert_eq!(trailing_segment("https://store/x/y.mp4#t=3"), Some("y.mp4"));
        assert_eq!(trailing_segment("relative/path.bin"), Some("path.bin"));
    }
}
