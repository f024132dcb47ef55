//! Asynchronous completion events from the installer subsystem.
//!
//! Each committed session or submitted uninstall produces exactly one
//! terminal event, possibly preceded by a single non-terminal
//! pending-user-action event for the same operation. Events are routed by
//! the [`CommitToken`](crate::installer::CommitToken) the broker passed at
//! submission.

use crate::installer::CommitToken;
use crate::status::STATUS_PENDING_USER_ACTION;

/// Broker-assigned identifier for one accepted install/uninstall request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(pub u64);

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// Opaque payload describing the interactive confirmation the platform
/// wants to run for a pending-user-action event.
///
/// The broker never inspects it; the relay hands it to the launcher seam
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAction(pub Vec<u8>);

/// A completion event delivered by the installer subsystem.
#[derive(Debug, Clone)]
pub struct CompletionEvent {
    /// The token issued at commit/uninstall submission.
    pub token: CommitToken,
    /// Package the operation applied to.
    pub package_name: String,
    /// Outcome status; opaque except the pending-user-action sentinel.
    pub status: i32,
    /// Optional human-readable detail from the subsystem.
    pub extra_message: Option<String>,
    /// Present only on pending-user-action events.
    pub user_action: Option<UserAction>,
}

impl CompletionEvent {
    /// Returns `true` if this event requires interactive confirmation
    /// rather than callback delivery.
    #[must_use]
    pub const fn is_pending_user_action(&self) -> bool {
        self.status == STATUS_PENDING_USER_ACTION
    }
}
