//! Descriptions of the JSON the model is asked to return.
//!
//! A reply type lists its fields once through [`OutputSchema`]. From that
//! list [`SchemaDescriptor`] derives both the textual hint embedded in every
//! prompt and the JSON Schema used to check replies, so the two cannot drift.

use jsonschema::Validator;
use serde_json::{json, Map, Value};

use crate::error::{AuditError, Result};

/// JSON type of a reply field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
}

impl FieldType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }
}

/// One field of a structured reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    /// Whether the model is told the field is required.
    pub required: bool,
    /// Value substituted when the model omits the field anyway.
    /// Fields with a default are not enforced when checking replies.
    pub default: Option<&'static str>,
    pub description: &'static str,
}

/// Implemented by types the model is asked to produce.
pub trait OutputSchema {
    /// Fields in the order they are presented to the model.
    fn fields() -> &'static [FieldSpec];
}

/// Prompt rendering and reply checking for one output type.
#[derive(Debug, Clone, Copy)]
pub struct SchemaDescriptor {
    fields: &'static [FieldSpec],
}

impl SchemaDescriptor {
    #[must_use]
    pub fn of<T: OutputSchema>() -> Self {
        Self {
            fields: T::fields(),
        }
    }

    #[must_use]
    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    /// Render the shape hint embedded in prompts.
    ///
    /// Output is a JSON object literal mapping each field name to a short
    /// description of its type and requiredness, in declaration order.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("{\n");
        for (i, field) in self.fields.iter().enumerate() {
            let requiredness = if field.required { "required" } else { "optional" };
            let hint = format!(
                "{} ({requiredness}): {}",
                field.field_type.as_str(),
                field.description
            );
            out.push_str("  ");
            out.push_str(&Value::from(field.name).to_string());
            out.push_str(": ");
            out.push_str(&Value::from(hint).to_string());
            if i + 1 < self.fields.len() {
                out.push(',');
            }
            out.push('\n');
        }
        out.push('}');
        out
    }

    /// JSON Schema used to check replies.
    ///
    /// Only fields without a default end up in `required`.
    #[must_use]
    pub fn json_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            properties.insert(
                field.name.to_string(),
                json!({ "type": field.field_type.as_str() }),
            );
        }
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.default.is_none())
            .map(|f| f.name)
            .collect();

        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Compile [`Self::json_schema`] into a validator.
    pub fn validator(&self) -> Result<ReplyValidator> {
        let validator = Validator::new(&self.json_schema())
            .map_err(|e| AuditError::Config(format!("failed to compile reply schema: {e}")))?;
        Ok(ReplyValidator {
            validator,
            fields: self.fields,
        })
    }
}

/// Compiled reply checker.
pub struct ReplyValidator {
    validator: Validator,
    fields: &'static [FieldSpec],
}

impl ReplyValidator {
    /// Validate a reply, collecting every violation.
    pub fn validate(&self, value: &Value) -> std::result::Result<(), Vec<String>> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(value)
            .map(|e| {
                let path = e.instance_path().to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fill in defaults for omitted fields of an object reply.
    pub fn apply_defaults(&self, value: &mut Value) {
        if let Value::Object(map) = value {
            for field in self.fields {
                if let Some(default) = field.default {
                    map.entry(field.name)
                        .or_insert_with(|| Value::from(default));
                }
            }
        }
    }
}
