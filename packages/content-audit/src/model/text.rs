//! Content units submitted for auditing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Kind of payload carried by an [`AuditText`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileType {
    /// Plain text; `content` is the text itself.
    #[default]
    Text,
    /// An image; `content` is a `data:<mime>;base64,...` URL.
    Image { mime: String },
}

/// A unit of content to audit.
///
/// Immutable after construction; the id is generated by the constructor.
#[derive(Debug, Clone, Serialize)]
pub struct AuditText {
    id: Uuid,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
    file_type: FileType,
}

impl AuditText {
    /// Create a plain-text item. Empty content is allowed.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            source: None,
            metadata: None,
            file_type: FileType::Text,
        }
    }

    /// Create an image item from a data URL.
    #[must_use]
    pub fn image(data_url: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            file_type: FileType::Image { mime: mime.into() },
            ..Self::new(data_url)
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }

    #[must_use]
    pub fn file_type(&self) -> &FileType {
        &self.file_type
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        matches!(self.file_type, FileType::Image { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content_is_legal() {
        let text = AuditText::new("");
        assert_eq!(text.content(), "");
        assert!(text.source().is_none());
        assert!(!text.is_image());
    }

    #[test]
    fn test_texts_get_distinct_ids() {
        assert_ne!(AuditText::new("a").id(), AuditText::new("a").id());
    }

    #[test]
    fn test_image_keeps_mime() {
        let image = AuditText::image("data:image/png;base64,AAAA", "image/png").with_source("a.png");
        assert!(image.is_image());
        assert_eq!(
            image.file_type(),
            &FileType::Image {
                mime: "image/png".to_string()
            }
        );
        assert_eq!(image.source(), Some("a.png"));
    }

    #[test]
    fn test_serialized_file_type_is_tagged() {
        let json = serde_json::to_value(AuditText::new("x")).expect("serialize");
        assert_eq!(json["file_type"]["type"], "text");
        assert!(json.get("source").is_none());
    }
}
