use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{TypeError, TypeResult};

/// Scheme shared by every local object url, Tessera's or not.
pub const REFERENCE_SCHEME: &str = "blob:";

/// Prefix of references minted by Tessera.
pub const REFERENCE_PREFIX: &str = "blob:tessera/";

/// Opaque, globally-unique token standing in for a payload that lives only
/// for the current editing session.
///
/// Tokens are minted by the registry's handle table; holding an
/// `EphemeralRef` says nothing about whether its handle is still live.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EphemeralRef(String);

impl EphemeralRef {
    /// Mint a fresh token. UUID v7 keeps tokens unique and roughly ordered by
    /// creation time.
    pub fn mint() -> Self {
        Self(format!("{REFERENCE_PREFIX}{}", Uuid::now_v7()))
    }

    /// Wrap an existing token string, rejecting anything that is not
    /// reference-shaped.
    pub fn parse(s: &str) -> TypeResult<Self> {
        if Self::is_reference(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(TypeError::InvalidReference(s.to_string()))
        }
    }

    /// Whether a string is reference-shaped. Only tokens carrying
    /// [`REFERENCE_PREFIX`] qualify; other `blob:` urls are plain strings.
    pub fn is_reference(s: &str) -> bool {
        s.len() > REFERENCE_PREFIX.len() && s.starts_with(REFERENCE_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for EphemeralRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EphemeralRef({})", self.0)
    }
}

impl fmt::Display for EphemeralRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for EphemeralRef {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for EphemeralRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<EphemeralRef> for String {
    fn from(r: EphemeralRef) -> Self {
        r.0
    }
}
