//! Domain model: rubrics, texts, decisions and results.

mod decision;
mod item;
mod result;
mod text;

pub use decision::AuditDecision;
pub use item::{AuditOption, AuditOptionsItem, OptionSet};
pub use result::{
    excerpt, AuditResult, TokenUsage, ANNOTATION_CHOICE_OUTSIDE_OPTIONS, ANNOTATION_ERROR_KIND,
    ERROR_CHOICE,
};
pub use text::{AuditText, FileType};
