use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AuditError, Result};
use crate::model::{AuditOptionsItem, OptionSet};

/// On-disk shape of a rubric. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct RubricDocument {
    name: String,
    instruction: String,
    options: OptionSet,
}

/// Builds [`AuditOptionsItem`]s from literals, JSON values and JSON files.
pub struct ItemLoader;

impl ItemLoader {
    /// Create a rubric from `(label, meaning)` pairs, keeping their order.
    pub fn create<I, L, M>(
        name: impl Into<String>,
        instruction: impl Into<String>,
        options: I,
    ) -> Result<AuditOptionsItem>
    where
        I: IntoIterator<Item = (L, M)>,
        L: Into<String>,
        M: Into<String>,
    {
        let name = name.into();
        let options = OptionSet::from_pairs(options).map_err(|reason| AuditError::InvalidItem {
            name: name.clone(),
            reason,
        })?;
        AuditOptionsItem::new(name, instruction, options)
    }

    /// Build a rubric from a JSON object with `name`, `instruction` and `options`.
    pub fn from_value(value: &Value) -> Result<AuditOptionsItem> {
        let document =
            RubricDocument::deserialize(value).map_err(|e| AuditError::InvalidItem {
                name: value
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("<unnamed>")
                    .to_string(),
                reason: e.to_string(),
            })?;
        AuditOptionsItem::new(document.name, document.instruction, document.options)
    }

    /// Parse a rubric from a JSON string.
    ///
    /// Options keep the order they have in `json`.
    pub fn from_json_str(json: &str) -> Result<AuditOptionsItem> {
        let document: RubricDocument =
            serde_json::from_str(json).map_err(|e| AuditError::InvalidItem {
                name: "<unparsed>".to_string(),
                reason: e.to_string(),
            })?;
        AuditOptionsItem::new(document.name, document.instruction, document.options)
    }

    /// Load a rubric from a JSON file.
    ///
    /// # Errors
    /// `PathNotFound` when the file is missing, `InvalidRubricFile` when it
    /// is not a valid rubric (including bytes that are not UTF-8).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<AuditOptionsItem> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AuditError::PathNotFound(path.to_path_buf()));
        }

        let invalid = |message: String| AuditError::InvalidRubricFile {
            path: path.to_path_buf(),
            message,
        };

        let bytes = fs::read(path)?;
        let document: RubricDocument =
            serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;

        AuditOptionsItem::new(document.name, document.instruction, document.options)
            .map_err(|e| invalid(e.to_string()))
    }

    /// Load several rubric files, in the order given.
    pub fn from_json_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<AuditOptionsItem>> {
        paths.iter().map(|p| Self::from_json_file(p)).collect()
    }

    /// Every `*.json` rubric in a directory (not recursive), sorted by path.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Vec<AuditOptionsItem>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(AuditError::PathNotFound(dir.to_path_buf()));
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        paths.retain(|p| p.is_file() && super::extension_of(p) == "json");
        paths.sort();

        Self::from_json_files(&paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_create_keeps_order() {
        let item = ItemLoader::create(
            "ads",
            "Does the text advertise?",
            [("True", "ad"), ("False", "no ad"), ("不确定", "unsure")],
        )
        .expect("item");
        let labels: Vec<&str> = item.options().labels().collect();
        assert_eq!(labels, vec!["True", "False", "不确定"]);
    }

    #[test]
    fn test_create_rejects_duplicates() {
        let err = ItemLoader::create("ads", "check", [("a", "x"), ("a", "y")])
            .expect_err("duplicate");
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }

    #[test]
    fn test_from_value_ignores_unknown_fields() {
        let item = ItemLoader::from_value(&json!({
            "name": "sensitive",
            "instruction": "check for secrets",
            "options": {"有": "yes", "无": "no"},
            "version": 3
        }))
        .expect("item");
        assert_eq!(item.name(), "sensitive");
        assert_eq!(item.options().len(), 2);
    }

    #[test]
    fn test_from_value_missing_field() {
        let err = ItemLoader::from_value(&json!({
            "name": "sensitive",
            "options": {"有": "yes"}
        }))
        .expect_err("missing instruction");
        assert_eq!(err.kind(), ErrorKind::InputValidation);
        assert!(err.to_string().contains("sensitive"));
    }

    #[test]
    fn test_from_value_empty_options() {
        let err = ItemLoader::from_value(&json!({
            "name": "sensitive",
            "instruction": "check",
            "options": {}
        }))
        .expect_err("empty options");
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }

    #[test]
    fn test_json_entry_points_keep_option_order() {
        let expected = vec!["有", "无", "不确定"];

        let item = ItemLoader::from_json_str(
            r#"{"name":"sensitive","instruction":"check","options":{"有":"y","无":"n","不确定":"u"}}"#,
        )
        .expect("from str");
        assert_eq!(item.options().labels().collect::<Vec<_>>(), expected);

        let item = ItemLoader::from_value(&json!({
            "name": "sensitive",
            "instruction": "check",
            "options": {"有": "y", "无": "n", "不确定": "u"}
        }))
        .expect("from value");
        assert_eq!(item.options().labels().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_from_json_str_malformed() {
        let err = ItemLoader::from_json_str("{not json").expect_err("malformed");
        assert_eq!(err.kind(), ErrorKind::InputValidation);
    }
}
