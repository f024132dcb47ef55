//! Trait seam for the opaque OS installer subsystem.
//!
//! The broker never performs privileged package operations itself; it
//! stages content into a subsystem-owned session and hands control over.
//! This module defines the narrow contract the broker needs from that
//! subsystem:
//!
//! 1. `create_session` / `open_write` / `commit` for multi-part installs
//! 2. `uninstall` for direct removal submission
//! 3. `abandon` to discard a session that failed staging
//!
//! # Lifecycle
//!
//! A session is committed at most once. After `commit` (or `uninstall`)
//! returns, the privileged work happens out of process; the subsystem later
//! delivers exactly one terminal [`CompletionEvent`](crate::event::CompletionEvent)
//! carrying the [`CommitToken`] passed at submission, possibly preceded by
//! one non-terminal pending-user-action event.

use std::fmt;
use std::io::Write;

use thiserror::Error;

use crate::event::OperationId;

/// Identifier of a subsystem-owned install session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Which commit path a deferred-invocation token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitAction {
    /// Result of a committed install session.
    InstallCommit,
    /// Result of a submitted uninstall.
    UninstallCommit,
}

/// Deferred-invocation token bound to one submitted operation.
///
/// The subsystem echoes the token in the completion event it delivers for
/// the operation; the relay uses the embedded [`OperationId`] to route the
/// event to the callback registered at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitToken {
    /// The broker-assigned operation this token correlates.
    pub operation: OperationId,
    /// The commit path the token was issued for.
    pub action: CommitAction,
}

impl CommitToken {
    /// Creates a token for an install-commit result.
    #[must_use]
    pub const fn install(operation: OperationId) -> Self {
        Self {
            operation,
            action: CommitAction::InstallCommit,
        }
    }

    /// Creates a token for an uninstall-commit result.
    #[must_use]
    pub const fn uninstall(operation: OperationId) -> Self {
        Self {
            operation,
            action: CommitAction::UninstallCommit,
        }
    }
}

/// Parameters for opening an install session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionParams {
    /// Install flags passed through from the caller, opaque to the broker.
    pub flags: i32,
}

/// A writable stream into an open session.
///
/// Total size is unknown at open; the stager writes to end-of-input and
/// then durably syncs before the next stream is opened.
pub trait SessionStream: Write + Send {
    /// Durably flushes everything written so far.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the sync fails; the stager treats this as a
    /// staging failure and abandons the session.
    fn sync_data(&mut self) -> std::io::Result<()>;
}

/// Errors reported by the installer subsystem before control passes out of
/// process. Failures after commit arrive as completion events instead.
#[derive(Debug, Error)]
pub enum InstallerError {
    /// The subsystem refused to open a session.
    #[error("could not create install session: {reason}")]
    SessionCreation {
        /// Subsystem-reported reason.
        reason: String,
    },

    /// The named session does not exist or is no longer open.
    #[error("unknown install session: {session}")]
    UnknownSession {
        /// The session id that was not found.
        session: SessionId,
    },

    /// The subsystem rejected a commit (e.g. the session was already
    /// committed).
    #[error("commit rejected for {session}: {reason}")]
    CommitRejected {
        /// The session whose commit was rejected.
        session: SessionId,
        /// Subsystem-reported reason.
        reason: String,
    },

    /// The subsystem rejected an uninstall submission.
    #[error("uninstall rejected for '{package_name}': {reason}")]
    UninstallRejected {
        /// The package whose removal was rejected.
        package_name: String,
        /// Subsystem-reported reason.
        reason: String,
    },

    /// I/O failure inside the subsystem boundary.
    #[error("installer I/O failure: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

/// The opaque OS installer subsystem.
///
/// Implementations are expected to be shared across threads: staging runs
/// on the transport's per-call thread while completion events are produced
/// on the subsystem's own delivery thread.
pub trait PackageInstaller: Send + Sync {
    /// Opens a new full-install session and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`InstallerError::SessionCreation`] if the subsystem refuses
    /// to open a session.
    fn create_session(&self, params: &SessionParams) -> Result<SessionId, InstallerError>;

    /// Opens a named write stream into an open session.
    ///
    /// Stream names are `<packageName>_<index>` with `index` counting blob
    /// order from zero. The total size is unknown at open.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown or the stream cannot be
    /// opened.
    fn open_write(
        &self,
        session: SessionId,
        name: &str,
    ) -> Result<Box<dyn SessionStream>, InstallerError>;

    /// Commits a fully staged session.
    ///
    /// After a successful return the session is owned by the subsystem
    /// until the completion event carrying `token` arrives. A session is
    /// committed at most once.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown or already committed.
    fn commit(&self, session: SessionId, token: CommitToken) -> Result<(), InstallerError>;

    /// Discards a session that will not be committed.
    ///
    /// Best effort: used on staging failure, after which no completion
    /// event will ever arrive for the session.
    fn abandon(&self, session: SessionId);

    /// Submits an uninstall of `package_name` directly (no session).
    ///
    /// The completion event for the removal carries `token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the subsystem rejects the submission.
    fn uninstall(
        &self,
        package_name: &str,
        flags: i32,
        token: CommitToken,
    ) -> Result<(), InstallerError>;

    /// Reports whether the hosting process holds the OS-level permission
    /// required to install and update packages.
    fn holds_install_permission(&self) -> bool;
}
