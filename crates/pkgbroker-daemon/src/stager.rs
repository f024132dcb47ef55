//! Session staging.
//!
//! Streams each content blob of an install request into a subsystem-owned
//! session and commits the session with the deferred-invocation token the
//! relay will later match against the completion event.
//!
//! # Staging protocol
//!
//! For an N-blob install of `pkg`:
//!
//! 1. Create a full-install session.
//! 2. For each blob, in request order: open the blob, open session stream
//!    `pkg_<index>` (index from 0, size unknown), copy with a fixed 64 KiB
//!    buffer to end-of-input, durably sync the stream, close both before
//!    the next blob is touched.
//! 3. Commit the session with the token.
//!
//! Any failure before commit abandons the session; committing is skipped
//! entirely so no completion event will ever arrive for the attempt. The
//! gate surfaces the failure to the caller synchronously instead.

use std::io::{Read, Write};

use pkgbroker_core::{
    BlobUri, CommitToken, ContentError, ContentResolver, InstallerError, PackageInstaller,
    SessionId, SessionParams, SessionStream,
};
use thiserror::Error;
use tracing::{debug, error, info};

/// Copy buffer size for streaming blobs into a session.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Errors aborting a staging attempt before commit.
#[derive(Debug, Error)]
pub enum StagingError {
    /// The request carried no blobs; an empty session is never created.
    #[error("install request for '{package_name}' carried no content blobs")]
    NoBlobs {
        /// The package the empty request named.
        package_name: String,
    },

    /// A blob reference could not be resolved or opened.
    #[error("blob {index} of '{package_name}' unreadable: {source}")]
    Content {
        /// The package being staged.
        package_name: String,
        /// Zero-based blob index.
        index: usize,
        /// Resolver error.
        source: ContentError,
    },

    /// Reading a blob or writing into the session failed.
    #[error("staging blob {index} of '{package_name}' failed: {source}")]
    Copy {
        /// The package being staged.
        package_name: String,
        /// Zero-based blob index.
        index: usize,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The installer subsystem rejected a session operation.
    #[error(transparent)]
    Installer(#[from] InstallerError),
}

/// Stages multi-blob install requests into installer sessions.
pub struct SessionStager<'a> {
    installer: &'a dyn PackageInstaller,
    resolver: &'a dyn ContentResolver,
}

impl<'a> SessionStager<'a> {
    /// Creates a stager over the given collaborator seams.
    #[must_use]
    pub const fn new(
        installer: &'a dyn PackageInstaller,
        resolver: &'a dyn ContentResolver,
    ) -> Self {
        Self {
            installer,
            resolver,
        }
    }

    /// Stages `blobs` into a fresh session for `package_name` and commits
    /// it with `token`.
    ///
    /// Synchronous and blocking: returns once the commit has been
    /// submitted. The privileged install itself happens out of process; its
    /// outcome arrives later as a completion event carrying `token`.
    ///
    /// # Errors
    ///
    /// Returns a [`StagingError`] if the blob list is empty or any step
    /// before commit fails. On failure the session is abandoned and no
    /// completion event will be produced for this attempt.
    pub fn stage_and_commit(
        &self,
        package_name: &str,
        blobs: &[BlobUri],
        flags: i32,
        token: CommitToken,
    ) -> Result<(), StagingError> {
        if blobs.is_empty() {
            return Err(StagingError::NoBlobs {
                package_name: package_name.to_string(),
            });
        }

        let params = SessionParams { flags };
        let session = self.installer.create_session(&params)?;
        debug!(package = package_name, %session, blobs = blobs.len(), "install session created");

        match self.stage_blobs(session, package_name, blobs) {
            Ok(()) => {},
            Err(error) => {
                error!(package = package_name, %session, %error, "staging failed; abandoning session");
                self.installer.abandon(session);
                return Err(error);
            },
        }

        if let Err(error) = self.installer.commit(session, token) {
            error!(package = package_name, %session, %error, "commit submission failed; abandoning session");
            self.installer.abandon(session);
            return Err(error.into());
        }

        info!(
            package = package_name,
            %session,
            operation = %token.operation,
            "session committed; awaiting completion event"
        );
        Ok(())
    }

    /// Convenience entry point for single-blob installs.
    ///
    /// # Errors
    ///
    /// Propagates [`stage_and_commit`](Self::stage_and_commit) errors.
    pub fn stage_single(
        &self,
        package_name: &str,
        blob: BlobUri,
        flags: i32,
        token: CommitToken,
    ) -> Result<(), StagingError> {
        self.stage_and_commit(package_name, &[blob], flags, token)
    }

    fn stage_blobs(
        &self,
        session: SessionId,
        package_name: &str,
        blobs: &[BlobUri],
    ) -> Result<(), StagingError> {
        let mut buffer = vec![0u8; COPY_BUFFER_SIZE];

        for (index, uri) in blobs.iter().enumerate() {
            let mut reader =
                self.resolver
                    .open_blob(uri)
                    .map_err(|source| StagingError::Content {
                        package_name: package_name.to_string(),
                        index,
                        source,
                    })?;

            let stream_name = format!("{package_name}_{index}");
            let mut writer = self.installer.open_write(session, &stream_name)?;

            // Streams drop (and so close) on every exit path out of this
            // scope, including mid-copy failures.
            let copied = Self::copy_blob(&mut *reader, &mut *writer, &mut buffer).map_err(
                |source| StagingError::Copy {
                    package_name: package_name.to_string(),
                    index,
                    source,
                },
            )?;

            writer.sync_data().map_err(|source| StagingError::Copy {
                package_name: package_name.to_string(),
                index,
                source,
            })?;

            debug!(
                package = package_name,
                %session,
                stream = stream_name,
                bytes = copied,
                "blob staged"
            );
        }

        Ok(())
    }

    fn copy_blob(
        reader: &mut dyn Read,
        writer: &mut dyn SessionStream,
        buffer: &mut [u8],
    ) -> std::io::Result<u64> {
        let mut total = 0u64;
        loop {
            let read = reader.read(buffer)?;
            if read == 0 {
                return Ok(total);
            }
            writer.write_all(&buffer[..read])?;
            total += read as u64;
        }
    }
}
