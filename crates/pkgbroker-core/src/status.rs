//! Installer status-code vocabulary.
//!
//! The OS installer subsystem reports outcomes as integers. The broker
//! treats every value opaquely except [`STATUS_PENDING_USER_ACTION`], which
//! marks a non-terminal event that must be redirected to the interactive
//! confirmation flow instead of the caller's callback.
//!
//! Values follow the platform installer's documented convention. The one
//! broker-local addition is [`STATUS_FAILURE_UNSUPPORTED`], used for the
//! legacy entry points that carry too little information to stage and for
//! staging failures surfaced synchronously through the callback.

/// Non-terminal: the operation needs interactive user confirmation before
/// it can proceed. Never forwarded to the caller's callback.
pub const STATUS_PENDING_USER_ACTION: i32 = -1;

/// Terminal: the operation succeeded.
pub const STATUS_SUCCESS: i32 = 0;

/// Terminal: generic failure. Also the fixed code for authorization
/// denials.
pub const STATUS_FAILURE: i32 = 1;

/// Terminal: the operation was blocked by device policy.
pub const STATUS_FAILURE_BLOCKED: i32 = 2;

/// Terminal: the operation was aborted.
pub const STATUS_FAILURE_ABORTED: i32 = 3;

/// Terminal: the package content was invalid.
pub const STATUS_FAILURE_INVALID: i32 = 4;

/// Terminal: the operation conflicted with an installed package.
pub const STATUS_FAILURE_CONFLICT: i32 = 5;

/// Terminal: insufficient storage.
pub const STATUS_FAILURE_STORAGE: i32 = 6;

/// Terminal: the package is incompatible with the device.
pub const STATUS_FAILURE_INCOMPATIBLE: i32 = 7;

/// Terminal, broker-local: the requested entry point is not supported.
/// Staging failures use plain [`STATUS_FAILURE`] instead.
pub const STATUS_FAILURE_UNSUPPORTED: i32 = 8;

/// Returns `true` for every status except the pending-user-action
/// sentinel.
#[must_use]
pub const fn is_terminal(status: i32) -> bool {
    status != STATUS_PENDING_USER_ACTION
}
