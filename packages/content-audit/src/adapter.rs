//! Turns a conversation into a parsed [`AuditDecision`].

use serde_json::Value;
use tracing::debug;

use crate::client::{ChatRequest, LlmClient, Message, ResponseFormat};
use crate::error::{AuditError, Result};
use crate::model::{AuditDecision, TokenUsage};
use crate::schema::{ReplyValidator, SchemaDescriptor};

/// A parsed decision and what it cost.
#[derive(Debug, Clone)]
pub struct Decided {
    pub decision: AuditDecision,
    pub usage: TokenUsage,
}

/// Sends audit conversations through an [`LlmClient`] and parses the replies.
///
/// The adapter does not retry; every failure is returned to the caller.
pub struct LlmAdapter<'a, C: LlmClient> {
    client: &'a C,
    model: String,
    temperature: f64,
    max_tokens: Option<u32>,
    json_mode: bool,
    validator: ReplyValidator,
}

impl<'a, C: LlmClient> LlmAdapter<'a, C> {
    /// Create an adapter for `model` on top of a pre-built client.
    ///
    /// Defaults: temperature 0, no token cap, JSON response format requested.
    pub fn new(client: &'a C, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client,
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            json_mode: true,
            validator: SchemaDescriptor::of::<AuditDecision>().validator()?,
        })
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Whether to ask the endpoint for JSON-only output.
    ///
    /// Turn this off for endpoints that reject `response_format`; replies
    /// are then searched for the first JSON object.
    #[must_use]
    pub fn json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `messages` and parse the reply into a decision.
    pub fn decide(&self, messages: Vec<Message>) -> Result<Decided> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: self.json_mode.then(ResponseFormat::json_object),
        };

        let response = self.client.complete(&request)?;

        let preview: String = response.content.chars().take(200).collect();
        debug!(model = self.model, reply_preview = preview.as_str(), "LLM reply");

        let decision = self.parse_decision(&response.content)?;
        Ok(Decided {
            decision,
            usage: response.usage,
        })
    }

    /// Extract, check and deserialize the decision in `reply`.
    ///
    /// Balanced `{ ... }` spans are tried in order; the first one that
    /// parses as a JSON object is taken as the decision.
    pub fn parse_decision(&self, reply: &str) -> Result<AuditDecision> {
        let mut first_error = None;
        let mut parsed = None;

        for candidate in json_object_candidates(reply) {
            match serde_json::from_str::<Value>(candidate) {
                Ok(value @ Value::Object(_)) => {
                    parsed = Some(value);
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        let mut value = match (parsed, first_error) {
            (Some(value), _) => value,
            (None, Some(e)) => {
                return Err(AuditError::Parse(format!("invalid JSON in reply: {e}")));
            }
            (None, None) => {
                return Err(AuditError::Parse(format!("no JSON object in reply: {reply:?}")));
            }
        };

        self.validator
            .validate(&value)
            .map_err(|errors| AuditError::Parse(errors.join(", ")))?;
        self.validator.apply_defaults(&mut value);

        serde_json::from_value(value).map_err(|e| AuditError::Parse(e.to_string()))
    }
}

/// Locate the first balanced `{ ... }` object in `text`.
///
/// Braces inside JSON string literals (including escaped quotes) are
/// ignored while matching. Returns `None` when no object closes.
///
/// # Examples
/// ```
/// use content_audit::adapter::extract_json_object;
///
/// let reply = "Sure! {\"choice\": \"a\", \"reason\": \"uses } in text\"} Hope that helps.";
/// assert_eq!(
///     extract_json_object(reply),
///     Some("{\"choice\": \"a\", \"reason\": \"uses } in text\"}")
/// );
/// ```
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    json_object_candidates(text).next()
}

/// Every balanced `{ ... }` span in `text`, by start position.
fn json_object_candidates(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices('{').filter_map(move |(start, _)| {
        matching_brace(&text[start..]).map(|end| &text[start..start + end + 1])
    })
}

/// Byte index of the brace closing the one at index 0 of `text`.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}
