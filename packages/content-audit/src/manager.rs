//! Audit orchestration: single audits and cartesian-product batches.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::adapter::LlmAdapter;
use crate::client::LlmClient;
use crate::error::{AuditError, Result};
use crate::model::{
    AuditDecision, AuditOptionsItem, AuditResult, AuditText, ANNOTATION_CHOICE_OUTSIDE_OPTIONS,
    ANNOTATION_ERROR_KIND, ERROR_CHOICE,
};
use crate::prompt;

/// What to do when the model picks a label the rubric does not offer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChoicePolicy {
    /// Fail with [`AuditError::ChoiceNotInOptions`].
    #[default]
    Strict,
    /// Keep the choice verbatim and annotate the result with
    /// `choice_outside_options = "true"`.
    Lenient,
}

/// What a batch does when one (text, item) pair fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchErrorPolicy {
    /// Stop at the first failure and return its error.
    #[default]
    Abort,
    /// Record a synthetic result for the failed pair and keep going.
    ///
    /// The synthetic result has `decision.choice == ERROR_CHOICE`, the error
    /// message as `decision.reason` and an `error_kind` annotation.
    ContinueOnError,
}

/// Sequences audits and assembles their results.
///
/// Strictly sequential: each audit blocks on the LLM call before the next
/// one starts, and batch results come back in iteration order.
pub struct AuditManager<'a, C: LlmClient> {
    adapter: LlmAdapter<'a, C>,
    choice_policy: ChoicePolicy,
    on_error: BatchErrorPolicy,
}

impl<'a, C: LlmClient> AuditManager<'a, C> {
    pub fn new(adapter: LlmAdapter<'a, C>) -> Self {
        Self {
            adapter,
            choice_policy: ChoicePolicy::default(),
            on_error: BatchErrorPolicy::default(),
        }
    }

    #[must_use]
    pub fn choice_policy(mut self, policy: ChoicePolicy) -> Self {
        self.choice_policy = policy;
        self
    }

    #[must_use]
    pub fn on_error(mut self, policy: BatchErrorPolicy) -> Self {
        self.on_error = policy;
        self
    }

    /// Audit one text against one rubric.
    ///
    /// The result has no batch id.
    pub fn audit_one(&self, text: &AuditText, item: &AuditOptionsItem) -> Result<AuditResult> {
        self.audit_pair(text, item, None).inspect_err(|e| {
            warn!(text_id = %text.id(), item = item.name(), error = %e, "audit failed");
        })
    }

    /// Audit every text against every rubric.
    ///
    /// Texts form the outer loop and rubrics the inner one, so `result[k]`
    /// belongs to `(texts[k / items.len()], items[k % items.len()])`. All
    /// results share one fresh batch id.
    pub fn audit_batch(
        &self,
        texts: &[AuditText],
        items: &[AuditOptionsItem],
    ) -> Result<Vec<AuditResult>> {
        self.audit_batch_with_progress(texts, items, |_| {})
    }

    /// Like [`Self::audit_batch`], calling `on_result` after every pair.
    pub fn audit_batch_with_progress<F>(
        &self,
        texts: &[AuditText],
        items: &[AuditOptionsItem],
        mut on_result: F,
    ) -> Result<Vec<AuditResult>>
    where
        F: FnMut(&AuditResult),
    {
        let batch_id = Uuid::new_v4();
        let total = texts.len() * items.len();
        info!(%batch_id, texts = texts.len(), items = items.len(), total, "starting audit batch");

        let mut results = Vec::with_capacity(total);

        for text in texts {
            for item in items {
                let result = match self.audit_pair(text, item, Some(batch_id)) {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(
                            %batch_id,
                            text_id = %text.id(),
                            item = item.name(),
                            error = %e,
                            "audit failed"
                        );
                        match self.on_error {
                            BatchErrorPolicy::Abort => return Err(e),
                            BatchErrorPolicy::ContinueOnError => {
                                error_result(text, item, batch_id, &e)
                            }
                        }
                    }
                };
                on_result(&result);
                results.push(result);
            }
        }

        let failed = results.iter().filter(|r| r.is_error()).count();
        info!(%batch_id, total = results.len(), failed, "audit batch finished");

        Ok(results)
    }

    fn audit_pair(
        &self,
        text: &AuditText,
        item: &AuditOptionsItem,
        batch_id: Option<Uuid>,
    ) -> Result<AuditResult> {
        debug!(text_id = %text.id(), item = item.name(), "auditing");

        let messages = prompt::build_messages(text, item);
        let decided = self.adapter.decide(messages)?;

        let in_options = item.options().contains(&decided.decision.choice);
        if !in_options && self.choice_policy == ChoicePolicy::Strict {
            return Err(AuditError::ChoiceNotInOptions {
                item_name: item.name().to_string(),
                text_id: text.id(),
                choice: decided.decision.choice,
                allowed: item.options().labels().map(String::from).collect(),
            });
        }

        let mut result = AuditResult::new(text, item, decided.decision, batch_id);
        result.token_usage = decided.usage;
        if !in_options {
            result
                .annotations
                .insert(ANNOTATION_CHOICE_OUTSIDE_OPTIONS.to_string(), "true".to_string());
        }

        info!(
            text_id = %text.id(),
            item = item.name(),
            choice = result.decision.choice.as_str(),
            "audit complete"
        );

        Ok(result)
    }
}

fn error_result(
    text: &AuditText,
    item: &AuditOptionsItem,
    batch_id: Uuid,
    error: &AuditError,
) -> AuditResult {
    let decision = AuditDecision {
        choice: ERROR_CHOICE.to_string(),
        reason: error.to_string(),
    };
    let mut result = AuditResult::new(text, item, decision, Some(batch_id));
    result
        .annotations
        .insert(ANNOTATION_ERROR_KIND.to_string(), error.kind().to_string());
    result
}
