//! Loaders that build rubrics and texts from values and files.
//!
//! Loaders only construct domain entities. They never reach into an
//! [`AuditManager`](crate::manager::AuditManager).

mod items;
mod media;
mod texts;

pub use items::ItemLoader;
pub use media::MediaLoader;
pub use texts::{normalize_newlines, LoadOptions, TextLoader};

use std::path::Path;

/// Lowercased extension of `path` without the dot, or an empty string.
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default()
}
