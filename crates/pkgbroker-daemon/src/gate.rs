//! The privileged request surface.
//!
//! [`PrivilegedGate`] is what the transport exposes to the trusted caller.
//! Every state-mutating operation re-runs caller authorization at entry;
//! denied requests are reported synchronously through the caller's own
//! callback contract (fixed status, fixed message) and never touch the
//! installer subsystem.
//!
//! Accepted requests register their callback under a fresh operation id,
//! then either stage-and-commit an install session or submit an uninstall,
//! both with a [`CommitToken`] bound to that id. The terminal outcome
//! arrives later through the [`ResultRelay`](crate::relay::ResultRelay)
//! sharing this gate's [`CallbackRegistry`].
//!
//! # Security Invariants
//!
//! - Authorization is a per-call check, never cached and never skipped for
//!   a mutating operation.
//! - A staging failure removes the just-registered callback and reports the
//!   failure through it, so the callback is not left dangling for an event
//!   that will never arrive.
//! - The legacy entry points that carry no package name are explicit
//!   unsupported failures, not silent no-ops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pkgbroker_core::status::{STATUS_FAILURE, STATUS_FAILURE_UNSUPPORTED};
use pkgbroker_core::{BlobUri, CommitToken, ContentResolver, OperationId, PackageInstaller};
use tracing::{error, info, warn};

use crate::authorizer::{CallerAuthorizer, CallerIdentity};
use crate::relay::{CallbackRegistry, ResultCallback};
use crate::stager::SessionStager;

/// Fixed denial message for install-path operations.
pub const INSTALL_DENIED: &str = "Installer not allowed";

/// Fixed denial message for the uninstall path.
pub const UNINSTALL_DENIED: &str = "Uninstaller not allowed";

/// Fixed message for the unsupported legacy entry points.
pub const LEGACY_UNSUPPORTED: &str =
    "install by content reference only is not supported; use the package-named entry point";

/// Privileged request endpoint composing authorizer, stager, and the
/// callback registry the relay delivers into.
pub struct PrivilegedGate {
    authorizer: CallerAuthorizer,
    installer: Arc<dyn PackageInstaller>,
    resolver: Arc<dyn ContentResolver>,
    registry: Arc<CallbackRegistry>,
    next_operation: AtomicU64,
}

impl PrivilegedGate {
    /// Creates a gate over the collaborator seams.
    ///
    /// `registry` must be the same registry the completion-event relay
    /// delivers into, otherwise accepted requests can never resolve.
    #[must_use]
    pub fn new(
        authorizer: CallerAuthorizer,
        installer: Arc<dyn PackageInstaller>,
        resolver: Arc<dyn ContentResolver>,
        registry: Arc<CallbackRegistry>,
    ) -> Self {
        Self {
            authorizer,
            installer,
            resolver,
            registry,
            next_operation: AtomicU64::new(1),
        }
    }

    /// Pre-flight check: caller is trusted AND this process holds the OS
    /// install permission.
    #[must_use]
    pub fn has_privileged_permissions(&self, caller: &dyn CallerIdentity) -> bool {
        self.authorizer
            .has_privileged_permissions(caller, &*self.installer)
    }

    /// Installs a single-blob package. Delegates to the split path with a
    /// one-element list.
    pub fn install_package(
        &self,
        caller: &dyn CallerIdentity,
        package_name: &str,
        blob: BlobUri,
        flags: i32,
        installer_name: &str,
        callback: Arc<dyn ResultCallback>,
    ) {
        self.install_split_package(
            caller,
            package_name,
            vec![blob],
            flags,
            installer_name,
            callback,
        );
    }

    /// Stages and commits a split-package install session.
    ///
    /// Synchronous up to commit submission; the terminal result arrives
    /// asynchronously through the relay. Denials and staging failures are
    /// reported synchronously through `callback`.
    pub fn install_split_package(
        &self,
        caller: &dyn CallerIdentity,
        package_name: &str,
        blobs: Vec<BlobUri>,
        flags: i32,
        installer_name: &str,
        callback: Arc<dyn ResultCallback>,
    ) {
        if !self.authorizer.is_caller_allowed(caller) {
            deliver(&*callback, package_name, STATUS_FAILURE, Some(INSTALL_DENIED));
            return;
        }

        let operation = self.allocate_operation();
        info!(
            %operation,
            package = package_name,
            blobs = blobs.len(),
            installer = installer_name,
            "install request accepted"
        );

        // Register before commit: the completion event may race the
        // stager's return on the subsystem's delivery thread.
        self.registry.register(operation, callback.clone());

        let stager = SessionStager::new(&*self.installer, &*self.resolver);
        let token = CommitToken::install(operation);
        if let Err(staging_error) = stager.stage_and_commit(package_name, &blobs, flags, token) {
            // No completion event will ever arrive for this attempt; the
            // callback must not be left dangling.
            self.registry.remove(operation);
            error!(%operation, package = package_name, %staging_error, "install staging failed");
            deliver(
                &*callback,
                package_name,
                STATUS_FAILURE,
                Some(&staging_error.to_string()),
            );
        }
    }

    /// Submits an uninstall of `package_name`.
    ///
    /// No session is staged; the subsystem receives the request directly
    /// with an uninstall-commit token. The same registration and relay
    /// rules apply as for installs.
    pub fn delete_package(
        &self,
        caller: &dyn CallerIdentity,
        package_name: &str,
        flags: i32,
        installer_name: &str,
        callback: Arc<dyn ResultCallback>,
    ) {
        if !self.authorizer.is_caller_allowed(caller) {
            deliver(&*callback, package_name, STATUS_FAILURE, Some(UNINSTALL_DENIED));
            return;
        }

        let operation = self.allocate_operation();
        info!(
            %operation,
            package = package_name,
            installer = installer_name,
            "uninstall request accepted"
        );

        self.registry.register(operation, callback.clone());

        let token = CommitToken::uninstall(operation);
        if let Err(installer_error) = self.installer.uninstall(package_name, flags, token) {
            self.registry.remove(operation);
            error!(%operation, package = package_name, %installer_error, "uninstall submission failed");
            deliver(
                &*callback,
                package_name,
                STATUS_FAILURE,
                Some(&installer_error.to_string()),
            );
        }
    }

    /// Legacy uninstall form without an installer name. True synonym of
    /// [`delete_package`](Self::delete_package) with a defaulted name.
    pub fn delete_package_legacy(
        &self,
        caller: &dyn CallerIdentity,
        package_name: &str,
        flags: i32,
        callback: Arc<dyn ResultCallback>,
    ) {
        self.delete_package(caller, package_name, flags, "", callback);
    }

    /// Legacy install form carrying a content reference but no package
    /// name.
    ///
    /// Unsupported: session streams are named after the package, which this
    /// form does not provide. Reports an explicit unsupported failure
    /// instead of silently doing nothing.
    pub fn install_package_legacy(
        &self,
        caller: &dyn CallerIdentity,
        blob: &BlobUri,
        _flags: i32,
        _installer_name: &str,
        callback: Arc<dyn ResultCallback>,
    ) {
        if !self.authorizer.is_caller_allowed(caller) {
            deliver(&*callback, "", STATUS_FAILURE, Some(INSTALL_DENIED));
            return;
        }
        warn!(blob = %blob, "legacy nameless install form invoked");
        deliver(
            &*callback,
            "",
            STATUS_FAILURE_UNSUPPORTED,
            Some(LEGACY_UNSUPPORTED),
        );
    }

    /// Legacy split-install form without a package name. Unsupported, like
    /// [`install_package_legacy`](Self::install_package_legacy).
    pub fn install_split_package_legacy(
        &self,
        caller: &dyn CallerIdentity,
        blobs: &[BlobUri],
        _flags: i32,
        _installer_name: &str,
        callback: Arc<dyn ResultCallback>,
    ) {
        if !self.authorizer.is_caller_allowed(caller) {
            deliver(&*callback, "", STATUS_FAILURE, Some(INSTALL_DENIED));
            return;
        }
        warn!(blobs = blobs.len(), "legacy nameless split-install form invoked");
        deliver(
            &*callback,
            "",
            STATUS_FAILURE_UNSUPPORTED,
            Some(LEGACY_UNSUPPORTED),
        );
    }

    fn allocate_operation(&self) -> OperationId {
        OperationId(self.next_operation.fetch_add(1, Ordering::Relaxed))
    }
}

/// Synchronous callback delivery with containment: a dead caller is logged,
/// never propagated.
fn deliver(callback: &dyn ResultCallback, package_name: &str, status: i32, message: Option<&str>) {
    if let Err(error) = callback.handle_result(package_name, status, message) {
        error!(package = package_name, status, %error, "synchronous callback delivery failed");
    }
}
