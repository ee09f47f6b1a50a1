use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EXCERPT_MAX_CHARS;
use crate::model::{AuditDecision, AuditOptionsItem, AuditText};

/// Choice recorded on synthetic results produced for failed pairs in
/// continue-on-error batches.
pub const ERROR_CHOICE: &str = "__error__";

/// Annotation set when a failed pair was recorded instead of aborting.
pub const ANNOTATION_ERROR_KIND: &str = "error_kind";

/// Annotation set when a lenient manager accepted an unknown choice.
pub const ANNOTATION_CHOICE_OUTSIDE_OPTIONS: &str = "choice_outside_options";

/// Token usage reported by the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Durable record of one audit.
///
/// Carries ids instead of references so it can be serialized and kept
/// independently of the text and rubric that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditResult {
    pub id: Uuid,
    /// Present iff produced by a batch; shared by all results of that batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<Uuid>,
    pub text_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub text_excerpt: String,
    pub decision: AuditDecision,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub token_usage: TokenUsage,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl AuditResult {
    pub(crate) fn new(
        text: &AuditText,
        item: &AuditOptionsItem,
        decision: AuditDecision,
        batch_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_id,
            text_id: text.id(),
            item_id: item.id(),
            item_name: item.name().to_string(),
            text_excerpt: excerpt_for(text),
            decision,
            created_at: Utc::now(),
            token_usage: TokenUsage::default(),
            annotations: BTreeMap::new(),
        }
    }

    /// Whether this is a synthetic result for a failed pair.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.annotations.contains_key(ANNOTATION_ERROR_KIND)
    }
}

/// Excerpt shown for a text: a char-boundary-safe prefix of the content.
///
/// Images get an empty excerpt; a prefix of a data URL says nothing.
fn excerpt_for(text: &AuditText) -> String {
    if text.is_image() {
        return String::new();
    }
    excerpt(text.content(), EXCERPT_MAX_CHARS)
}

/// First `max_chars` characters of `content`.
///
/// # Examples
/// ```
/// use content_audit::model::excerpt;
///
/// assert_eq!(excerpt("电话 13800138000", 2), "电话");
/// assert_eq!(excerpt("short", 80), "short");
/// ```
#[must_use]
pub fn excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((end, _)) => content[..end].to_string(),
        None => content.to_string(),
    }
}
