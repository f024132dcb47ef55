//! Domain types and collaborator seams for the privileged package broker.
//!
//! This crate carries no service logic. It defines:
//!
//! - [`identity`]: the signing-certificate digest that is the sole caller
//!   authorization predicate.
//! - [`status`]: the installer status-code vocabulary, including the
//!   distinguished pending-user-action sentinel.
//! - [`installer`]: the trait seam for the opaque OS installer subsystem
//!   (sessions, commit tokens, uninstall submission).
//! - [`event`]: the asynchronous completion event the subsystem delivers
//!   back through a commit token.
//! - [`content`]: blob references and the content-resolution seam used to
//!   stream package parts into a session.

pub mod content;
pub mod event;
pub mod identity;
pub mod installer;
pub mod status;

pub use content::{BlobUri, ContentError, ContentResolver, FsContentResolver};
pub use event::{CompletionEvent, OperationId, UserAction};
pub use identity::{IdentityError, SigningDigest};
pub use installer::{
    CommitAction, CommitToken, InstallerError, PackageInstaller, SessionId, SessionParams,
    SessionStream,
};
