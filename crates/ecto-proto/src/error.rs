//! Error types shared by every crate in the workspace.

/// Errors surfaced by collaborators and bounded waits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cooperative hard stop fired. Never retried, never swallowed.
    #[error("hard stop requested")]
    HardStop,

    /// A collaborator could not answer yet (UI not visible, read failed).
    #[error("{what} unavailable")]
    Unavailable {
        /// What could not be read.
        what: String,
    },

    /// A collaborator reported an unexpected fault.
    #[error("collaborator fault: {0}")]
    Collaborator(String),
}

impl Error {
    /// Creates an [`Error::Unavailable`] for the named thing.
    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::Unavailable { what: what.into() }
    }

    /// Returns true for the cooperative hard stop.
    pub fn is_hard_stop(&self) -> bool {
        matches!(self, Self::HardStop)
    }

    /// Re-raises the hard stop and hands every other error back for logging.
    ///
    /// Step handlers call this with `?` so a hard stop escapes the handler
    /// while ordinary faults are downgraded to a transient retry.
    pub fn rethrow_hard_stop(self) -> Result<Self> {
        if self.is_hard_stop() { Err(self) } else { Ok(self) }
    }
}

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
