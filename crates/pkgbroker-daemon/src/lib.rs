//! Privileged package broker daemon.
//!
//! One trusted caller application is allowed to install and uninstall
//! packages through this broker; the broker holds the OS-level install
//! permission the caller lacks. Every privileged request passes three
//! stages:
//!
//! 1. [`authorizer`]: the caller's signing digest is re-derived and checked
//!    against the pinned expected digest on every call (fail closed).
//! 2. [`stager`]: install content is streamed blob-by-blob into a
//!    subsystem-owned session and committed with a deferred-invocation
//!    token; uninstalls are submitted directly with such a token.
//! 3. [`relay`]: the subsystem's asynchronous completion event is routed by
//!    the token's operation id back to the callback registered at
//!    submission, or redirected to the interactive confirmation flow for
//!    pending-user-action events.
//!
//! [`gate`] composes the three behind the request surface the transport
//! exposes to the caller. [`config`] carries the pinned digest and the
//! non-release relaxation flag.
//!
//! # Security Invariants
//!
//! - The authorization check runs at the entry of every state-mutating
//!   operation; it is never cached across calls.
//! - Denied requests never reach the installer subsystem; the denial is
//!   reported through the caller's own callback contract.
//! - Completion events route strictly by operation id; events carrying an
//!   unknown id are dropped.
//! - A callback failure is contained at the relay; a dead caller never
//!   crashes the broker.

pub mod authorizer;
pub mod config;
pub mod gate;
pub mod relay;
pub mod stager;

pub use authorizer::{CallerAuthorizer, CallerIdentity};
pub use config::{BrokerConfig, ConfigError};
pub use gate::PrivilegedGate;
pub use relay::{CallbackError, CallbackRegistry, ResultCallback, ResultRelay, UserActionLauncher};
pub use stager::{SessionStager, StagingError};
