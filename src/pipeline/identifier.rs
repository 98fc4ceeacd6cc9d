//! Content identifier derivation.
//!
//! Embed links look like `https://host/embeds/<id>/content` or
//! `https://host/document/<id>/<title>`: the identifier is always the
//! second-to-last path segment. Nothing beyond non-emptiness is checked, so
//! an odd link yields an odd identifier rather than an error.

use crate::error::Embed2PdfError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical key naming one document's source content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentIdentifier(String);

impl ContentIdentifier {
    /// Derive the identifier from an input reference.
    pub fn from_reference(reference: &str) -> Result<Self, Embed2PdfError> {
        let segment = reference
            .trim()
            .rsplit('/')
            .nth(1)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Embed2PdfError::InvalidReference {
                reference: reference.to_string(),
            })?;
        Ok(Self(segment.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_link() {
        let id = ContentIdentifier::from_reference(
            "https://www.scribd.com/embeds/512345678/content?start_page=1",
        )
        .unwrap();
        assert_eq!(id.as_str(), "512345678");
    }

    #[test]
    fn document_link() {
        let id =
            ContentIdentifier::from_reference("https://www.scribd.com/document/99/Some-Title")
                .unwrap();
        assert_eq!(id.to_string(), "99");
    }

    #[test]
    fn trailing_slash_takes_last_real_segment() {
        let id = ContentIdentifier::from_reference("https://example.com/embeds/abc/").unwrap();
        assert_eq!(id.as_str(), "abc");
    }

    #[test]
    fn malformed_but_segmented_reference_is_accepted() {
        let id = ContentIdentifier::from_reference("foo/bar").unwrap();
        assert_eq!(id.as_str(), "foo");
    }

    #[test]
    fn single_segment_is_rejected() {
        let err = ContentIdentifier::from_reference("nothing-here").unwrap_err();
        assert!(matches!(err, Embed2PdfError::InvalidReference { .. }));
    }

    #[test]
    fn empty_segment_is_rejected() {
        assert!(ContentIdentifier::from_reference("https://example.com//x").is_err());
        assert!(ContentIdentifier::from_reference("").is_err());
    }
}
