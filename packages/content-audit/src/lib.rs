//! Content Audit - Classify content against rubrics with an LLM.
//!
//! This crate audits texts (and images) against named rubrics, each with a
//! closed set of options. Every (text, rubric) pair becomes one chat
//! completion; the model must reply with a JSON object picking one of the
//! rubric's labels, which is checked before it is accepted.
//!
//! # Example
//!
//! ```
//! use content_audit::loader::{ItemLoader, TextLoader};
//!
//! let item = ItemLoader::create(
//!     "Phone number",
//!     "Does the text contain a phone number?",
//!     [("yes", "a phone number appears"), ("no", "no phone number")],
//! )
//! .unwrap();
//! let text = TextLoader::create("Call me at 13800138000", None, None);
//!
//! assert_eq!(item.options().first_label(), Some("yes"));
//! assert_eq!(text.content(), "Call me at 13800138000");
//! ```
//!
//! # Architecture
//!
//! - [`model`]: Rubrics, texts, decisions and results
//! - [`error`]: Error types and Result alias
//! - [`config`]: Constants and LLM client configuration
//! - [`schema`]: Reply shape shown to the model and checked on return
//! - [`prompt`]: Prompt construction
//! - [`client`]: Chat-completion client trait and HTTP implementation
//! - [`adapter`]: Sends prompts and parses decisions
//! - [`manager`]: Single and batch audits
//! - [`loader`]: Rubric, text and image loaders
//! - [`cli`]: Command-line interface

pub mod adapter;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod loader;
pub mod manager;
pub mod model;
pub mod prompt;
pub mod schema;

// Re-export commonly used items
pub use adapter::LlmAdapter;
pub use client::{LlmClient, OpenAiClient};
pub use config::ClientConfig;
pub use error::{AuditError, ErrorKind, Result};
pub use loader::{ItemLoader, LoadOptions, MediaLoader, TextLoader};
pub use manager::{AuditManager, BatchErrorPolicy, ChoicePolicy};
pub use model::{
    AuditDecision, AuditOption, AuditOptionsItem, AuditResult, AuditText, FileType, OptionSet,
    TokenUsage,
};

#[cfg(any(test, feature = "test-utils"))]
pub use client::test_support::MockLlmClient;
