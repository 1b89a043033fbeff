//! Error types for the prompt groups engine

use thiserror::Error;

/// Result type for prompt group operations
pub type Result<T> = std::result::Result<T, GroupError>;

/// Errors that can occur in prompt group operations
///
/// Runtime variants never abort more than the single requested change. Callers
/// log them and carry on; see [`GroupError::is_recoverable`].
#[derive(Debug, Error)]
pub enum GroupError {
    /// Entry identifier absent from the order list or from a group
    #[error("entry not found: {id}")]
    EntryNotFound { id: String },

    /// Group not found in the group tree
    #[error("group not found: {id}")]
    GroupNotFound { id: String },

    /// No active selection context to operate against
    #[error("no active selection context")]
    InvalidContext,

    /// Pending toggle ticket unknown or already resolved
    #[error("toggle ticket not found: {ticket}")]
    TicketNotFound { ticket: String },

    /// Duplicate group ID
    #[error("duplicate group ID: {id}")]
    DuplicateGroup { id: String },

    /// Structural operation that would corrupt the group tree
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    /// The order store refused to persist a mutation
    #[error("persist failed: {message}")]
    Persist { message: String },

    /// Configuration could not be extracted
    #[error("configuration error: {0}")]
    Config(Box<figment::Error>),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GroupError {
    /// Create an entry-not-found error
    pub fn entry_not_found(id: impl Into<String>) -> Self {
        Self::EntryNotFound { id: id.into() }
    }

    /// Create a group-not-found error
    pub fn group_not_found(id: impl Into<String>) -> Self {
        Self::GroupNotFound { id: id.into() }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a persist error
    pub fn persist(message: impl Into<String>) -> Self {
        Self::Persist {
            message: message.into(),
        }
    }

    /// Check whether this error only cancels the one requested change.
    ///
    /// Configuration and serialization failures happen while the engine is
    /// being set up and are the only variants that are not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_) | Self::Json(_))
    }

    /// Check if this is a not-found inconsistency (entry, group or ticket)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntryNotFound { .. } | Self::GroupNotFound { .. } | Self::TicketNotFound { .. }
        )
    }
}

impl From<figment::Error> for GroupError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}
