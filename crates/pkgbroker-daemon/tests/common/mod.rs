//! Mock collaborators for end-to-end broker tests.
//!
//! `MockInstaller` simulates the OS installer subsystem deterministically:
//! it records sessions, captures every staged byte, and synthesizes the
//! completion events a real subsystem would deliver out of process. Tests
//! drive the event side explicitly, so asynchronous delivery is exercised
//! without real concurrency flakiness.

// Not all test files use all utilities.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use pkgbroker_core::{
    BlobUri, CommitToken, CompletionEvent, ContentError, ContentResolver, InstallerError,
    PackageInstaller, SessionId, SessionParams, SessionStream, SigningDigest, UserAction,
};
use pkgbroker_daemon::authorizer::CallerIdentity;
use pkgbroker_daemon::relay::{CallbackError, ResultCallback, UserActionLauncher};

// =============================================================================
// MockInstaller
// =============================================================================

/// One staged write stream: name, captured bytes, synced flag.
#[derive(Debug, Clone, Default)]
pub struct StreamRecord {
    pub name: String,
    pub bytes: Vec<u8>,
    pub synced: bool,
}

/// One subsystem-owned session as the mock saw it.
#[derive(Debug, Clone, Default)]
pub struct SessionRecord {
    pub streams: Vec<StreamRecord>,
    pub committed_with: Option<CommitToken>,
    pub abandoned: bool,
}

/// One submitted uninstall.
#[derive(Debug, Clone)]
pub struct UninstallRecord {
    pub package_name: String,
    pub flags: i32,
    pub token: CommitToken,
}

/// Ordered staging actions, for drain-before-next-open assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagingAction {
    OpenWrite(String),
    Sync(String),
}

#[derive(Default)]
struct MockInstallerState {
    next_session: u64,
    sessions: BTreeMap<u64, SessionRecord>,
    uninstalls: Vec<UninstallRecord>,
    actions: Vec<StagingAction>,
    fail_write_in_stream: Option<String>,
}

/// Deterministic in-memory installer subsystem.
#[derive(Clone, Default)]
pub struct MockInstaller {
    state: Arc<Mutex<MockInstallerState>>,
    pub install_permission: bool,
}

impl MockInstaller {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockInstallerState::default())),
            install_permission: true,
        }
    }

    pub fn without_install_permission() -> Self {
        Self {
            install_permission: false,
            ..Self::new()
        }
    }

    /// Makes every write into the named stream fail mid-copy.
    pub fn fail_write_in_stream(&self, name: impl Into<String>) {
        let mut state = self.state.lock().expect("lock poisoned");
        state.fail_write_in_stream = Some(name.into());
    }

    pub fn session(&self, id: SessionId) -> Option<SessionRecord> {
        let state = self.state.lock().expect("lock poisoned");
        state.sessions.get(&id.0).cloned()
    }

    pub fn sessions(&self) -> Vec<(SessionId, SessionRecord)> {
        let state = self.state.lock().expect("lock poisoned");
        state
            .sessions
            .iter()
            .map(|(id, record)| (SessionId(*id), record.clone()))
            .collect()
    }

    pub fn uninstalls(&self) -> Vec<UninstallRecord> {
        let state = self.state.lock().expect("lock poisoned");
        state.uninstalls.clone()
    }

    pub fn actions(&self) -> Vec<StagingAction> {
        let state = self.state.lock().expect("lock poisoned");
        state.actions.clone()
    }

    /// True if the subsystem was never touched (the denial-path assertion).
    pub fn untouched(&self) -> bool {
        let state = self.state.lock().expect("lock poisoned");
        state.sessions.is_empty() && state.uninstalls.is_empty()
    }

    /// Token the given session was committed with.
    pub fn commit_token(&self, id: SessionId) -> CommitToken {
        self.session(id)
            .and_then(|record| record.committed_with)
            .expect("session was committed")
    }

    /// Token of the most recent uninstall submission.
    pub fn last_uninstall_token(&self) -> CommitToken {
        self.uninstalls().last().expect("an uninstall was submitted").token
    }

    /// Synthesizes the subsystem's terminal completion event.
    pub fn terminal_event(
        &self,
        token: CommitToken,
        package_name: &str,
        status: i32,
        extra_message: Option<&str>,
    ) -> CompletionEvent {
        CompletionEvent {
            token,
            package_name: package_name.to_string(),
            status,
            extra_message: extra_message.map(str::to_string),
            user_action: None,
        }
    }

    /// Synthesizes a pending-user-action event with an opaque payload.
    pub fn pending_event(&self, token: CommitToken, package_name: &str) -> CompletionEvent {
        CompletionEvent {
            token,
            package_name: package_name.to_string(),
            status: pkgbroker_core::status::STATUS_PENDING_USER_ACTION,
            extra_message: None,
            user_action: Some(UserAction(b"confirm-install".to_vec())),
        }
    }
}

struct MockStream {
    session: u64,
    name: String,
    state: Arc<Mutex<MockInstallerState>>,
    fail_writes: bool,
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.fail_writes {
            return Err(std::io::Error::other("simulated session write failure"));
        }
        let mut state = self.state.lock().expect("lock poisoned");
        let session = state
            .sessions
            .get_mut(&self.session)
            .expect("stream outlived session");
        let stream = session
            .streams
            .iter_mut()
            .rev()
            .find(|s| s.name == self.name)
            .expect("stream record exists");
        stream.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SessionStream for MockStream {
    fn sync_data(&mut self) -> std::io::Result<()> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.actions.push(StagingAction::Sync(self.name.clone()));
        let session = state
            .sessions
            .get_mut(&self.session)
            .expect("stream outlived session");
        if let Some(stream) = session.streams.iter_mut().rev().find(|s| s.name == self.name) {
            stream.synced = true;
        }
        Ok(())
    }
}

impl PackageInstaller for MockInstaller {
    fn create_session(&self, _params: &SessionParams) -> Result<SessionId, InstallerError> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.next_session += 1;
        let id = state.next_session;
        state.sessions.insert(id, SessionRecord::default());
        Ok(SessionId(id))
    }

    fn open_write(
        &self,
        session: SessionId,
        name: &str,
    ) -> Result<Box<dyn SessionStream>, InstallerError> {
        let mut state = self.state.lock().expect("lock poisoned");
        let fail_writes = state.fail_write_in_stream.as_deref() == Some(name);
        state.actions.push(StagingAction::OpenWrite(name.to_string()));
        let record = state
            .sessions
            .get_mut(&session.0)
            .ok_or(InstallerError::UnknownSession { session })?;
        record.streams.push(StreamRecord {
            name: name.to_string(),
            bytes: Vec::new(),
            synced: false,
        });
        Ok(Box::new(MockStream {
            session: session.0,
            name: name.to_string(),
            state: Arc::clone(&self.state),
            fail_writes,
        }))
    }

    fn commit(&self, session: SessionId, token: CommitToken) -> Result<(), InstallerError> {
        let mut state = self.state.lock().expect("lock poisoned");
        let record = state
            .sessions
            .get_mut(&session.0)
            .ok_or(InstallerError::UnknownSession { session })?;
        if record.committed_with.is_some() {
            return Err(InstallerError::CommitRejected {
                session,
                reason: "already committed".to_string(),
            });
        }
        record.committed_with = Some(token);
        Ok(())
    }

    fn abandon(&self, session: SessionId) {
        let mut state = self.state.lock().expect("lock poisoned");
        if let Some(record) = state.sessions.get_mut(&session.0) {
            record.abandoned = true;
        }
    }

    fn uninstall(
        &self,
        package_name: &str,
        flags: i32,
        token: CommitToken,
    ) -> Result<(), InstallerError> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.uninstalls.push(UninstallRecord {
            package_name: package_name.to_string(),
            flags,
            token,
        });
        Ok(())
    }

    fn holds_install_permission(&self) -> bool {
        self.install_permission
    }
}

// =============================================================================
// Caller identities
// =============================================================================

/// Certificate bytes the trusted-store fixture is "signed" with.
pub const TRUSTED_CERT: &[u8] = b"trusted store signing certificate";

/// The pinned digest fixtures authorize against.
pub fn trusted_digest() -> SigningDigest {
    SigningDigest::of_certificate(TRUSTED_CERT)
}

/// A fixed caller identity presenting the given digests.
pub struct FixedIdentity {
    pub package_name: String,
    pub digests: Vec<SigningDigest>,
}

impl FixedIdentity {
    pub fn trusted() -> Self {
        Self {
            package_name: "com.example.store".to_string(),
            digests: vec![trusted_digest()],
        }
    }

    pub fn untrusted() -> Self {
        Self {
            package_name: "com.example.impostor".to_string(),
            digests: vec![SigningDigest::of_certificate(b"impostor certificate")],
        }
    }
}

impl CallerIdentity for FixedIdentity {
    fn package_name(&self) -> &str {
        &self.package_name
    }

    fn signing_digests(&self) -> Result<Vec<SigningDigest>, pkgbroker_core::IdentityError> {
        Ok(self.digests.clone())
    }
}

// =============================================================================
// Recording callback and launcher
// =============================================================================

/// Callback capturing every delivery it receives.
#[derive(Default)]
pub struct RecordingCallback {
    deliveries: Mutex<Vec<(String, i32, Option<String>)>>,
}

impl RecordingCallback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deliveries(&self) -> Vec<(String, i32, Option<String>)> {
        self.deliveries.lock().expect("lock poisoned").clone()
    }
}

impl ResultCallback for RecordingCallback {
    fn handle_result(
        &self,
        package_name: &str,
        status: i32,
        extra_message: Option<&str>,
    ) -> Result<(), CallbackError> {
        self.deliveries.lock().expect("lock poisoned").push((
            package_name.to_string(),
            status,
            extra_message.map(str::to_string),
        ));
        Ok(())
    }
}

/// Launcher capturing pending-user-action payloads.
#[derive(Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<UserAction>>,
}

impl RecordingLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn launched(&self) -> Vec<UserAction> {
        self.launched.lock().expect("lock poisoned").clone()
    }
}

impl UserActionLauncher for RecordingLauncher {
    fn launch(&self, action: UserAction) -> Result<(), CallbackError> {
        self.launched.lock().expect("lock poisoned").push(action);
        Ok(())
    }
}

// =============================================================================
// Blob fixtures
// =============================================================================

/// A resolver serving blobs from memory, keyed by reference text.
#[derive(Default)]
pub struct MemoryResolver {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.blobs
            .lock()
            .expect("lock poisoned")
            .insert(uri.into(), bytes.into());
    }
}

impl ContentResolver for MemoryResolver {
    fn open_blob(
        &self,
        uri: &BlobUri,
    ) -> Result<Box<dyn std::io::Read + Send>, ContentError> {
        let blobs = self.blobs.lock().expect("lock poisoned");
        let bytes = blobs
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| ContentError::Unresolvable {
                uri: uri.to_string(),
                reason: "no such fixture blob".to_string(),
            })?;
        Ok(Box::new(std::io::Cursor::new(bytes)))
    }
}
