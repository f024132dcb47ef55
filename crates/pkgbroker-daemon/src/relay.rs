//! Completion-event relay.
//!
//! The installer subsystem performs privileged work out of process and
//! delivers one terminal completion event per committed session or
//! submitted uninstall, possibly preceded by a single pending-user-action
//! event for the same operation. The relay correlates each event back to
//! the callback registered when the request was accepted.
//!
//! # Callback registry
//!
//! Callbacks are keyed by [`OperationId`], populated at submission and
//! removed at terminal delivery. Keyed routing makes concurrent requests
//! safe: each completion reaches the callback of its own operation, never
//! whichever callback happened to be registered last.
//!
//! # Security
//!
//! The relay's event intake is wired only to the installer subsystem's
//! delivery channel; caller authorization is not re-run here. Events whose
//! operation id was never issued by this broker are dropped with a warning.
//! A callback that fails (dead caller) is logged and swallowed — it never
//! crashes the relay, and the registry entry is still consumed.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use pkgbroker_core::{CompletionEvent, OperationId, UserAction};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Error reported by a caller-supplied callback on delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("callback delivery failed: {reason}")]
pub struct CallbackError {
    /// Why the delivery failed (e.g. the remote caller has died).
    pub reason: String,
}

impl CallbackError {
    /// Creates a callback error with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Caller-supplied completion callback.
///
/// Invoked exactly once per accepted request that reaches a terminal
/// outcome. Implementations live on the far side of the transport and may
/// fail; the relay contains such failures.
pub trait ResultCallback: Send + Sync {
    /// Delivers a terminal result to the caller.
    ///
    /// # Errors
    ///
    /// Returns a [`CallbackError`] if the caller is unreachable. The relay
    /// logs and swallows it.
    fn handle_result(
        &self,
        package_name: &str,
        status: i32,
        extra_message: Option<&str>,
    ) -> Result<(), CallbackError>;
}

/// Launches the platform's interactive confirmation flow for
/// pending-user-action events.
pub trait UserActionLauncher: Send + Sync {
    /// Hands the opaque confirmation payload to the platform.
    ///
    /// # Errors
    ///
    /// Returns a [`CallbackError`] if the flow could not be launched; the
    /// relay logs it and leaves the operation's callback registered for the
    /// terminal event that will still arrive.
    fn launch(&self, action: UserAction) -> Result<(), CallbackError>;
}

/// Thread-safe registry of outstanding completion callbacks, keyed by
/// operation id.
#[derive(Default)]
pub struct CallbackRegistry {
    entries: RwLock<HashMap<OperationId, Arc<dyn ResultCallback>>>,
}

impl CallbackRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the callback for an accepted operation.
    ///
    /// An existing entry for the same id is replaced; ids are assigned from
    /// a monotone counter so this only occurs if the gate re-registers its
    /// own operation.
    pub fn register(&self, operation: OperationId, callback: Arc<dyn ResultCallback>) {
        let mut entries = self.entries.write().expect("lock poisoned");
        entries.insert(operation, callback);
    }

    /// Removes and returns the callback for `operation`, if registered.
    pub fn remove(&self, operation: OperationId) -> Option<Arc<dyn ResultCallback>> {
        let mut entries = self.entries.write().expect("lock poisoned");
        entries.remove(&operation)
    }

    /// Number of outstanding callbacks.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        let entries = self.entries.read().expect("lock poisoned");
        entries.len()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

/// Routes completion events to registered callbacks or the interactive
/// confirmation flow.
pub struct ResultRelay {
    registry: Arc<CallbackRegistry>,
    launcher: Arc<dyn UserActionLauncher>,
}

impl ResultRelay {
    /// Creates a relay over the shared registry and the launcher seam.
    #[must_use]
    pub fn new(registry: Arc<CallbackRegistry>, launcher: Arc<dyn UserActionLauncher>) -> Self {
        Self { registry, launcher }
    }

    /// The registry requests are registered into at submission.
    #[must_use]
    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    /// Handles one event from the installer subsystem.
    ///
    /// Runs on whatever thread the subsystem's delivery mechanism uses,
    /// independent of the thread that issued the original request.
    pub fn on_event(&self, event: &CompletionEvent) {
        let operation = event.token.operation;

        if event.is_pending_user_action() {
            debug!(
                %operation,
                package = event.package_name,
                "pending user action; redirecting to confirmation flow"
            );
            match event.user_action.clone() {
                Some(action) => {
                    if let Err(error) = self.launcher.launch(action) {
                        error!(%operation, %error, "confirmation flow launch failed");
                    }
                },
                None => {
                    warn!(%operation, "pending-user-action event carried no payload; dropping");
                },
            }
            // The callback stays registered; the terminal event for this
            // operation is still to come.
            return;
        }

        let Some(callback) = self.registry.remove(operation) else {
            warn!(
                %operation,
                package = event.package_name,
                status = event.status,
                "completion event for unknown operation; dropping"
            );
            return;
        };

        info!(
            %operation,
            package = event.package_name,
            status = event.status,
            "delivering terminal result"
        );
        if let Err(error) = callback.handle_result(
            &event.package_name,
            event.status,
            event.extra_message.as_deref(),
        ) {
            // A dead caller must never crash the relay. No retry: the
            // terminal outcome was produced exactly once and is now spent.
            error!(%operation, package = event.package_name, %error, "callback unreachable");
        }
    }
}
