//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// Every variant is a recoverable, local outcome: the rejected action has no
/// effect on session state and the caller decides how to surface it.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A payload, configuration value or roster reference failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A content item was not found in its bank.
    #[error("content item not found: {0}")]
    NotFound(u64),

    /// A vote targeted an item that is not a candidate for the voter.
    #[error("unknown vote candidate: {0}")]
    UnknownCandidate(u64),

    /// The player has already voted in this phase; the first vote stands.
    #[error("player {0} has already voted in this phase")]
    DoubleVoteRejected(Uuid),

    /// The action belongs to a phase other than the active one.
    #[error("{operation} is not accepted during {active}")]
    PhaseMismatch {
        /// The rejected operation.
        operation: &'static str,
        /// Name of the phase that was active.
        active: String,
    },

    /// This coordinator instance has no authority for the requested transition.
    #[error("coordinator is not authoritative for this transition")]
    NotAuthoritative,

    /// No hosted session exists with the given identifier.
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),

    /// An infrastructure error (poisoned lock, closed channel).
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

impl DomainError {
    /// Short machine-readable code for the error kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::UnknownCandidate(_) => "unknown_candidate",
            Self::DoubleVoteRejected(_) => "double_vote_rejected",
            Self::PhaseMismatch { .. } => "phase_mismatch",
            Self::NotAuthoritative => "not_authoritative",
            Self::SessionNotFound(_) => "session_not_found",
            Self::Infrastructure(_) => "infrastructure_error",
        }
    }

    /// Whether presentation layers should show this as a soft warning rather
    /// than silently absorbing it.
    #[must_use]
    pub fn is_soft_warning(&self) -> bool {
        matches!(self, Self::DoubleVoteRejected(_))
    }
}
