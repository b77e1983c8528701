//! Typed results from UI-facing collaborators.

use serde::{Deserialize, Serialize};

/// Three-valued answer from a UI query. Callers must branch on all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UiResult<T> {
    /// The widget is visible and the value was read.
    Found(T),
    /// The widget is visible but the value could not be determined.
    NotFound,
    /// The widget is not on screen.
    NotVisible,
}

impl<T> UiResult<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Returns the value if it was found.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound | Self::NotVisible => None,
        }
    }
}

/// Outcome of asking a collaborator to pick a menu entry.
///
/// Replaces an open-ended selection callback with one synchronous answer
/// evaluated inside a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuSelection {
    /// The wanted entry was offered and chosen.
    Selected,
    /// The menu opened but the wanted entry was not in it.
    NotOffered,
    /// The menu was dismissed before a choice was made.
    Cancelled,
}
