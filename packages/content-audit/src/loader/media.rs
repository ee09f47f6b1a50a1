use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::config::IMAGE_EXTENSIONS;
use crate::error::{AuditError, Result};
use crate::model::AuditText;

/// Builds image [`AuditText`]s for vision-capable models.
pub struct MediaLoader;

impl MediaLoader {
    /// Load an image file as a base64 data URL.
    pub fn from_file(path: impl AsRef<Path>) -> Result<AuditText> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AuditError::PathNotFound(path.to_path_buf()));
        }

        let extension = super::extension_of(path);
        let mime = mime_for(&extension).ok_or_else(|| AuditError::UnsupportedExtension {
            path: path.to_path_buf(),
            extension: extension.clone(),
            expected: IMAGE_EXTENSIONS
                .iter()
                .map(|(ext, _)| format!(".{ext}"))
                .collect::<Vec<_>>()
                .join(" / "),
        })?;

        let bytes = fs::read(path)?;
        let data_url = format!("data:{mime};base64,{}", STANDARD.encode(bytes));

        Ok(AuditText::image(data_url, mime).with_source(path.display().to_string()))
    }
}

fn mime_for(extension: &str) -> Option<&'static str> {
    IMAGE_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
}
