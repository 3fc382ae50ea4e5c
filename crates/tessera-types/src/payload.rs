use std::fmt;

use bytes::Bytes;
use mime::Mime;

use crate::content_type::{extension_for, parse_content_type};
use crate::error::TypeResult;

/// Raw binary content plus its content-type tag.
///
/// The bytes are held in a [`Bytes`] buffer so cloning a payload (for
/// instance to hand it to an upload task) never copies the content.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload {
    data: Bytes,
    content_type: String,
    name: Option<String>,
}

impl Payload {
    /// Create a payload. The content type is not validated here; the
    /// registry validates it on `add`.
    pub fn new(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.into(),
            name: None,
        }
    }

    /// Attach a display name (e.g. the file name it was downloaded as).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Size of the content in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The parsed content type, or an error if the tag is not a concrete
    /// MIME type.
    pub fn mime(&self) -> TypeResult<Mime> {
        parse_content_type(&self.content_type)
    }

    /// File extension for this payload's content type (`bin` fallback).
    pub fn extension(&self) -> String {
        extension_for(&self.content_type)
    }

    /// Consume the payload and return its bytes.
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .field("name", &self.name)
            .finish()
    }
}
