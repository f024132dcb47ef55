//! Caller signing identity.
//!
//! The sole authorization predicate of the broker is equality between a
//! caller's signing-certificate digest and a pinned expected digest. The
//! digest is a SHA-256 over the caller's signing certificate, carried here
//! as a 32-byte value with a lowercase-hex text form.
//!
//! # Security
//!
//! Equality is evaluated in constant time via [`subtle::ConstantTimeEq`] so
//! the comparison does not leak how much of a presented digest matched.
//! The digest itself is a public certificate fingerprint, not a secret, so
//! `Debug`/`Display` render it in full.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Byte length of a signing digest (SHA-256).
pub const DIGEST_LEN: usize = 32;

/// Errors from resolving or parsing caller signing identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The digest text form was not valid hex of the expected length.
    #[error("invalid signing digest '{input}': {reason}")]
    InvalidDigest {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The transport could not resolve the calling process's identity.
    ///
    /// Callers of the authorizer treat this as "not allowed" (fail closed).
    #[error("caller identity unresolvable: {reason}")]
    Unresolvable {
        /// Transport-reported reason.
        reason: String,
    },
}

/// SHA-256 digest of a signing certificate.
///
/// Constructed from raw certificate bytes via [`SigningDigest::of_certificate`]
/// or parsed from 64 lowercase hex characters via [`FromStr`].
#[derive(Clone, Copy, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SigningDigest([u8; DIGEST_LEN]);

impl SigningDigest {
    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Computes the digest of a certificate's DER bytes.
    #[must_use]
    pub fn of_certificate(der: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(der);
        Self(hasher.finalize().into())
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Constant-time equality against another digest.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

// PartialEq routes through the constant-time comparison so no call site can
// accidentally short-circuit on the first differing byte.
impl PartialEq for SigningDigest {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for SigningDigest {}

impl fmt::Display for SigningDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for SigningDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningDigest({})", hex::encode(self.0))
    }
}

impl FromStr for SigningDigest {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = hex::decode(s).map_err(|e| IdentityError::InvalidDigest {
            input: s.to_string(),
            reason: e.to_string(),
        })?;
        let bytes: [u8; DIGEST_LEN] =
            raw.try_into().map_err(|_| IdentityError::InvalidDigest {
                input: s.to_string(),
                reason: format!("expected {DIGEST_LEN} bytes"),
            })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for SigningDigest {
    type Error = IdentityError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SigningDigest> for String {
    fn from(digest: SigningDigest) -> Self {
        digest.to_string()
    }
}
