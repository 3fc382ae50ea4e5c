//! Coordinated rewrites for typed asset mappings.

use tessera_tree::{Key, Node, Owner};
use tessera_types::PermanentAsset;

/// Field holding a mapping's kind discriminator.
pub const KIND_FIELD: &str = "type";

/// Mapping kinds whose co-located descriptor fields must change together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// `{type: "video", url, mirrorUrl, storageKey, contentType, size}`
    Video,
}

impl AssetKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "video" => Some(AssetKind::Video),
            _ => None,
        }
    }

    /// The kind of `owner`, if it is a mapping with a recognised `type`.
    pub fn of(owner: &Owner<'_>) -> Option<Self> {
        owner.field(KIND_FIELD)?.as_str().and_then(Self::from_tag)
    }

    pub fn tag(&self) -> &'static str {
        match self {
            AssetKind::Video => "video",
        }
    }

    /// Fields that may hold the asset's reference.
    pub fn asset_fields(&self) -> &'static [&'static str] {
        match self {
            AssetKind::Video => &["url", "mirrorUrl", "storageKey"],
        }
    }

    pub fn is_asset_field(&self, field: &str) -> bool {
        self.asset_fields().contains(&field)
    }

    /// Refresh every descriptor field of `owner` from one upload result.
    pub fn refresh(&self, owner: &Owner<'_>, asset: &PermanentAsset) {
        match self {
            AssetKind::Video => {
                owner.set_field("url", Node::string(&asset.url));
                owner.set_field("mirrorUrl", Node::string(&asset.url));
                owner.set_field("storageKey", Node::string(&asset.storage_key));
                owner.set_field("contentType", Node::string(&asset.content_type));
                owner.set_field("size", Node::from(asset.size));
            }
        }
    }
}

/// Rewrite `owner[key]`, which held a reference now stored as `asset`.
pub(crate) fn apply_upload(key: Key<'_>, owner: &Owner<'_>, asset: &PermanentAsset) {
    match (AssetKind::of(owner), key.as_field()) {
        (Some(kind), Some(field)) if kind.is_asset_field(field) => {
            tracing::trace!(kind = kind.tag(), field, "refreshing typed asset descriptor");
            kind.refresh(owner, asset);
        }
        _ => {
            owner.set(key, Node::string(&asset.url));
        }
    }
}
