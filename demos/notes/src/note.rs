//! The note entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A note as the backend serves it.
///
/// The wire shape uses camelCase field names; `updatedAt` travels as an
/// ISO-8601 timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Server-assigned identifier.
    pub id: String,
    /// Markdown content; the first line doubles as the title.
    pub content: String,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// A note stamped with the current time.
    #[must_use]
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            updated_at: Utc::now(),
        }
    }

    /// First line of the content, without the markdown heading marker.
    #[must_use]
    pub fn title(&self) -> &str {
        self.content
            .lines()
            .next()
            .unwrap_or("")
            .trim_start_matches('#')
            .trim()
    }
}
