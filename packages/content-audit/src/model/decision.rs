use serde::{Deserialize, Serialize};

use crate::schema::{FieldSpec, FieldType, OutputSchema};

/// The model's structured verdict for one (text, rubric) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditDecision {
    /// One of the rubric's option labels, when the model behaves.
    pub choice: String,
    /// Free-text justification.
    #[serde(default)]
    pub reason: String,
}

impl OutputSchema for AuditDecision {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec {
                name: "choice",
                field_type: FieldType::String,
                required: true,
                default: None,
                description: "exactly one option label from the list above",
            },
            FieldSpec {
                name: "reason",
                field_type: FieldType::String,
                required: true,
                default: Some(""),
                description: "short justification for the choice",
            },
        ];
        FIELDS
    }
}
