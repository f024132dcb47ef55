//! Caller authorization.
//!
//! Exactly one caller application is trusted to issue privileged requests.
//! The transport hands the broker a per-call [`CallerIdentity`]; the
//! authorizer compares the presented signing digests against the single
//! pinned digest from configuration. The check runs at the entry of every
//! state-mutating operation and its result is never cached: in an IPC
//! setting "who is calling" must be re-derived per call.
//!
//! # Security
//!
//! - Digest comparison is constant time (see
//!   [`SigningDigest::matches`](pkgbroker_core::SigningDigest::matches)).
//! - Any failure to resolve the caller's identity denies the call (fail
//!   closed), never allows it.
//! - `allow_any_caller` is a non-release relaxation carried in config; it
//!   defaults to off and is logged loudly when it admits a caller.

use pkgbroker_core::{IdentityError, PackageInstaller, SigningDigest};
use tracing::{debug, warn};

/// Per-call view of the calling process's identity.
///
/// Implemented by the transport layer; the broker never constructs one
/// itself. Digest resolution may fail (e.g. the peer died mid-call), which
/// the authorizer treats as a denial.
pub trait CallerIdentity {
    /// The caller's package name, for diagnostics only — never an
    /// authorization input.
    fn package_name(&self) -> &str;

    /// The signing-certificate digests of the calling process.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Unresolvable`] if the transport cannot
    /// determine the caller's identity.
    fn signing_digests(&self) -> Result<Vec<SigningDigest>, IdentityError>;
}

/// Gatekeeper deciding whether the process on the other end of a call is
/// the one trusted caller.
#[derive(Debug, Clone)]
pub struct CallerAuthorizer {
    expected: SigningDigest,
    allow_any_caller: bool,
}

impl CallerAuthorizer {
    /// Creates an authorizer pinned to `expected`.
    #[must_use]
    pub const fn new(expected: SigningDigest, allow_any_caller: bool) -> Self {
        Self {
            expected,
            allow_any_caller,
        }
    }

    /// Creates an authorizer from broker configuration.
    #[must_use]
    pub fn from_config(config: &crate::config::BrokerConfig) -> Self {
        Self::new(config.expected_caller_digest, config.allow_any_caller)
    }

    /// Returns `true` iff the presented identity is the trusted caller.
    ///
    /// Must be invoked at the entry of every privileged operation. Identity
    /// resolution failures deny the call.
    #[must_use]
    pub fn is_caller_allowed(&self, caller: &dyn CallerIdentity) -> bool {
        if self.allow_any_caller {
            warn!(
                caller = caller.package_name(),
                "allow_any_caller relaxation admitted a caller without a digest check"
            );
            return true;
        }

        let digests = match caller.signing_digests() {
            Ok(digests) => digests,
            Err(error) => {
                // Fail closed: an unresolvable identity is never trusted.
                warn!(
                    caller = caller.package_name(),
                    %error,
                    "caller identity unresolvable; denying"
                );
                return false;
            },
        };

        let allowed = digests.iter().any(|digest| digest.matches(&self.expected));
        if allowed {
            debug!(caller = caller.package_name(), "caller digest matched");
        } else {
            warn!(
                caller = caller.package_name(),
                presented = digests.len(),
                "caller digest mismatch; denying"
            );
        }
        allowed
    }

    /// Returns `true` iff the caller is allowed AND the hosting process
    /// itself holds the OS install permission.
    ///
    /// Lets the caller pre-flight-check whether privileged operations are
    /// possible at all before attempting one.
    #[must_use]
    pub fn has_privileged_permissions(
        &self,
        caller: &dyn CallerIdentity,
        installer: &dyn PackageInstaller,
    ) -> bool {
        self.is_caller_allowed(caller) && installer.holds_install_permission()
    }
}
