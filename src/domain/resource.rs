//! Resource model
//!
//! A **Resource** is one file of a bundle: a `/`-separated path relative to
//! the collection root, its bytes, and a BLAKE3 hash of those bytes.

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::hash;

/// A file collected into a bundle
///
/// Content is immutable once collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    path: String,
    content: Vec<u8>,
    hash: String,
}

impl Resource {
    /// Create a resource, hashing its content
    ///
    /// `path` must already be validated and `/`-separated; see
    /// [`crate::collector::validate_relative_path`].
    pub fn new(path: impl Into<String>, content: Vec<u8>) -> Self {
        let hash = hash::hash_bytes(&content);
        Self {
            path: path.into(),
            content,
            hash,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// `blake3:<hex>` hash of the content
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Content as text, if it is valid UTF-8
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Serialized as `{name, content, encoding?}`: text content verbatim, binary
/// content base64 encoded with `encoding: base64`
impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (content, encoding): (Cow<'_, str>, Option<&str>) = match self.content_str() {
            Some(text) => (Cow::Borrowed(text), None),
            None => (Cow::Owned(STANDARD.encode(&self.content)), Some("base64")),
        };

        let fields = if encoding.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("Resource", fields)?;
        state.serialize_field("name", &self.path)?;
        state.serialize_field("content", &content)?;
        if let Some(encoding) = encoding {
            state.serialize_field("encoding", encoding)?;
        } else {
            state.skip_field("encoding")?;
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_hashes_content() {
        let resource = Resource::new("svc.yaml", b"kind: Service\n".to_vec());
        assert_eq!(resource.path(), "svc.yaml");
        assert!(resource.hash().starts_with("blake3:"));
        assert_eq!(resource.hash(), hash::hash_bytes(b"kind: Service\n"));
    }

    #[test]
    fn test_serialize_text() {
        let resource = Resource::new("cm.yaml", b"kind: ConfigMap\n".to_vec());
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["name"], "cm.yaml");
        assert_eq!(json["content"], "kind: ConfigMap\n");
        assert!(json.get("encoding").is_none());
    }

    #[test]
    fn test_serialize_binary() {
        let resource = Resource::new("logo.png", vec![0x89, 0x50, 0x4e, 0x47, 0xff]);
        assert!(resource.content_str().is_none());
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["encoding"], "base64");
        assert_eq!(json["content"], STANDARD.encode([0x89, 0x50, 0x4e, 0x47, 0xff]));
    }
}
