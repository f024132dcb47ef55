//! Blob references and content resolution.
//!
//! Install requests carry opaque content references; the stager resolves
//! each reference to a byte stream through the [`ContentResolver`] seam.
//! [`FsContentResolver`] is the filesystem-backed implementation: it
//! accepts plain paths and `file:` URIs, refuses anything that is not a
//! regular file, and opens read-only.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Opaque reference to one content blob (a package part).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUri(String);

impl BlobUri {
    /// Wraps a reference string.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Returns the reference text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlobUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

/// Errors from resolving a blob reference to a readable stream.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The reference does not name anything this resolver can open.
    #[error("unresolvable blob reference '{uri}': {reason}")]
    Unresolvable {
        /// The rejected reference.
        uri: String,
        /// Why it could not be resolved.
        reason: String,
    },

    /// The reference resolved to something other than a regular file.
    #[error("blob reference '{uri}' is not a regular file")]
    NotAFile {
        /// The rejected reference.
        uri: String,
    },

    /// I/O failure opening the blob.
    #[error("could not open blob '{uri}': {source}")]
    Open {
        /// The reference being opened.
        uri: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Resolves opaque blob references to readable byte streams.
pub trait ContentResolver: Send + Sync {
    /// Opens the referenced blob for reading.
    ///
    /// # Errors
    ///
    /// Returns a [`ContentError`] if the reference cannot be resolved or
    /// opened. The stager treats any error as a staging failure.
    fn open_blob(&self, uri: &BlobUri) -> Result<Box<dyn Read + Send>, ContentError>;
}

/// Filesystem-backed resolver for plain paths and `file:` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsContentResolver;

impl FsContentResolver {
    /// Creates a new resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn path_of(uri: &BlobUri) -> Result<PathBuf, ContentError> {
        let text = uri.as_str();
        if let Some(path) = text.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if let Some(path) = text.strip_prefix("file:") {
            return Ok(PathBuf::from(path));
        }
        if text.contains("://") {
            return Err(ContentError::Unresolvable {
                uri: text.to_string(),
                reason: "unsupported scheme".to_string(),
            });
        }
        Ok(PathBuf::from(text))
    }

    fn open_file(uri: &BlobUri, path: &Path) -> Result<File, ContentError> {
        let file = File::open(path).map_err(|source| ContentError::Open {
            uri: uri.to_string(),
            source,
        })?;
        // Refuse devices, pipes, and sockets; only regular package parts
        // are streamed into a session.
        let metadata = file.metadata().map_err(|source| ContentError::Open {
            uri: uri.to_string(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(ContentError::NotAFile {
                uri: uri.to_string(),
            });
        }
        Ok(file)
    }
}

impl ContentResolver for FsContentResolver {
    fn open_blob(&self, uri: &BlobUri) -> Result<Box<dyn Read + Send>, ContentError> {
        let path = Self::path_of(uri)?;
        let file = Self::open_file(uri, &path)?;
        debug!(uri = %uri, path = %path.display(), "opened blob for staging");
        Ok(Box::new(file))
    }
}
