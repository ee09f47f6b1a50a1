//! Error types for content auditing.
//!
//! Every failure surfaces as an [`AuditError`]. Callers that only care about
//! the broad category (bad input, transport, unparseable reply, ...) can match
//! on [`AuditError::kind`] instead of the individual variants.

use std::path::PathBuf;

use strum::{AsRefStr, Display};
use thiserror::Error;
use uuid::Uuid;

/// Broad category of an [`AuditError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A rubric, text or rubric file failed validation.
    InputValidation,
    /// Network failure, timeout or non-2xx response from the LLM endpoint.
    Transport,
    /// The model reply was not a usable JSON decision.
    Parse,
    /// The reply parsed, but its choice is not one of the rubric's labels.
    Schema,
    /// A path is missing or has an unsupported extension.
    Filesystem,
    /// The client could not be configured.
    Config,
}

/// Main error type for the content-audit library.
#[derive(Debug, Error)]
pub enum AuditError {
    /// A rubric could not be constructed.
    #[error("Invalid audit item '{name}': {reason}")]
    InvalidItem { name: String, reason: String },

    /// A text could not be constructed.
    #[error("Invalid audit text: {0}")]
    InvalidText(String),

    /// A rubric JSON file is malformed or misses required fields.
    #[error("Invalid rubric file {}: {message}", .path.display())]
    InvalidRubricFile { path: PathBuf, message: String },

    /// The requested text encoding is not known.
    #[error("Unknown text encoding: '{0}'")]
    UnknownEncoding(String),

    /// A file could not be decoded with the requested encoding.
    #[error("Failed to decode {} as {encoding}", .path.display())]
    Decode { path: PathBuf, encoding: String },

    /// HTTP request to the LLM endpoint failed (connect, timeout, body read).
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The LLM endpoint answered with a non-2xx status.
    #[error("LLM API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The model reply is not valid JSON or lacks a usable `choice`.
    #[error("Failed to parse LLM reply: {0}")]
    Parse(String),

    /// The model picked a label that the rubric does not offer.
    #[error(
        "Choice '{choice}' for item '{item_name}' (text {text_id}) is not one of: {}",
        .allowed.join(", ")
    )]
    ChoiceNotInOptions {
        item_name: String,
        text_id: Uuid,
        choice: String,
        allowed: Vec<String>,
    },

    /// A path given to a loader does not exist.
    #[error("Path not found: {}", .0.display())]
    PathNotFound(PathBuf),

    /// A loader was given a file it cannot read.
    #[error("Unsupported file type '{extension}' for {} (expected {expected})", .path.display())]
    UnsupportedExtension {
        path: PathBuf,
        extension: String,
        expected: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Client configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuditError {
    /// Category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidItem { .. }
            | Self::InvalidText(_)
            | Self::InvalidRubricFile { .. }
            | Self::UnknownEncoding(_)
            | Self::Decode { .. } => ErrorKind::InputValidation,
            Self::Transport(_) | Self::Api { .. } => ErrorKind::Transport,
            Self::Parse(_) => ErrorKind::Parse,
            Self::ChoiceNotInOptions { .. } => ErrorKind::Schema,
            Self::PathNotFound(_) | Self::UnsupportedExtension { .. } | Self::Io(_) => {
                ErrorKind::Filesystem
            }
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

/// Result type alias for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
