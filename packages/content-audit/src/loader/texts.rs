use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use serde_json::{Map, Value};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::{DEFAULT_ENCODING, TEXT_EXTENSIONS};
use crate::error::{AuditError, Result};
use crate::model::AuditText;

/// Options for reading text files.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Descend into subdirectories when loading a directory.
    pub recursive: bool,
    /// WHATWG encoding label, e.g. `utf-8` or `gbk`.
    pub encoding: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

/// Builds [`AuditText`]s from literals, JSON values and `.txt`/`.md` files.
pub struct TextLoader;

impl TextLoader {
    /// Create a text directly.
    #[must_use]
    pub fn create(
        content: impl Into<String>,
        source: Option<&str>,
        metadata: Option<Map<String, Value>>,
    ) -> AuditText {
        let mut text = AuditText::new(content);
        if let Some(source) = source {
            text = text.with_source(source);
        }
        if let Some(metadata) = metadata {
            text = text.with_metadata(metadata);
        }
        text
    }

    /// Build a text from a JSON object with `content` and optional
    /// `source` and `metadata`.
    ///
    /// A `metadata` value that is not an object is dropped.
    pub fn from_value(value: &Value) -> Result<AuditText> {
        let content = match value.get("content") {
            Some(Value::String(content)) => content,
            Some(_) => return Err(AuditError::InvalidText("'content' must be a string".into())),
            None => return Err(AuditError::InvalidText("missing 'content' field".into())),
        };

        let source = match value.get("source") {
            None | Some(Value::Null) => None,
            Some(Value::String(source)) => Some(source.as_str()),
            Some(_) => return Err(AuditError::InvalidText("'source' must be a string".into())),
        };

        let metadata = value.get("metadata").and_then(Value::as_object).cloned();

        Ok(Self::create(content.as_str(), source, metadata))
    }

    /// Load a single `.txt` or `.md` file.
    ///
    /// The content is decoded with `options.encoding` and newline-normalized;
    /// `source` is set to the path.
    pub fn from_file(path: impl AsRef<Path>, options: &LoadOptions) -> Result<AuditText> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AuditError::PathNotFound(path.to_path_buf()));
        }

        let extension = super::extension_of(path);
        if !TEXT_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AuditError::UnsupportedExtension {
                path: path.to_path_buf(),
                extension,
                expected: ".txt / .md".to_string(),
            });
        }

        let content = read_text(path, &options.encoding)?;
        Ok(AuditText::new(content).with_source(path.display().to_string()))
    }

    /// Load a file, or every `.txt`/`.md` file under a directory.
    ///
    /// Directory results are sorted by path.
    pub fn from_path(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Vec<AuditText>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AuditError::PathNotFound(path.to_path_buf()));
        }
        if path.is_file() {
            return Ok(vec![Self::from_file(path, options)?]);
        }

        let files = collect_text_files(path, options.recursive)?;
        debug!(dir = %path.display(), files = files.len(), "loading text directory");

        files
            .iter()
            .map(|file| Self::from_file(file, options))
            .collect()
    }

    /// Load several files and directories, in the order given.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P], options: &LoadOptions) -> Result<Vec<AuditText>> {
        let mut texts = Vec::new();
        for path in paths {
            texts.extend(Self::from_path(path, options)?);
        }
        Ok(texts)
    }
}

fn collect_text_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(dir);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if entry.file_type().is_file()
            && TEXT_EXTENSIONS.contains(&super::extension_of(path).as_str())
        {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn read_text(path: &Path, encoding_label: &str) -> Result<String> {
    let encoding = Encoding::for_label(encoding_label.trim().as_bytes())
        .ok_or_else(|| AuditError::UnknownEncoding(encoding_label.to_string()))?;

    let bytes = fs::read(path)?;
    let (content, had_errors) = encoding.decode_with_bom_removal(&bytes);
    if had_errors {
        return Err(AuditError::Decode {
            path: path.to_path_buf(),
            encoding: encoding.name().to_string(),
        });
    }

    Ok(normalize_newlines(&content))
}

/// Replace `\r\n` and lone `\r` with `\n`.
///
/// # Examples
/// ```
/// use content_audit::loader::normalize_newlines;
///
/// assert_eq!(normalize_newlines("a\r\nb\rc\n"), "a\nb\nc\n");
/// ```
#[must_use]
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_from_value_full() {
        let text = TextLoader::from_value(&json!({
            "content": "hello",
            "source": "chat#42",
            "metadata": {"lang": "en"}
        }))
        .expect("text");
        assert_eq!(text.content(), "hello");
        assert_eq!(text.source(), Some("chat#42"));
        assert_eq!(text.metadata().and_then(|m| m.get("lang")), Some(&json!("en")));
    }

    #[test]
    fn test_from_value_drops_non_object_metadata() {
        let text = TextLoader::from_value(&json!({"content": "x", "metadata": [1, 2]}))
            .expect("text");
        assert!(text.metadata().is_none());
    }

    #[test]
    fn test_from_value_requires_content() {
        let err = TextLoader::from_value(&json!({"source": "x"})).expect_err("no content");
        assert_eq!(err.kind(), ErrorKind::InputValidation);

        let err = TextLoader::from_value(&json!({"content": 5})).expect_err("bad content");
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }

    #[test]
    fn test_from_value_allows_empty_content() {
        let text = TextLoader::from_value(&json!({"content": ""})).expect("text");
        assert_eq!(text.content(), "");
    }

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines("x\r\ny"), "x\ny");
        assert_eq!(normalize_newlines("x\ry"), "x\ny");
        assert_eq!(normalize_newlines("\r\r\n"), "\n\n");
    }

    #[test]
    fn test_default_options() {
        let options = LoadOptions::default();
        assert!(options.recursive);
        assert_eq!(options.encoding, "utf-8");
    }
}
