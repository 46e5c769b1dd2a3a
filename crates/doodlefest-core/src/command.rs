//! Command abstractions.

use uuid::Uuid;

/// Trait that all commands implement.
///
/// Every command targets exactly one session; the host routes it to that
/// session's coordinator before handling.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The session this command is addressed to.
    fn session_id(&self) -> Uuid;
}
