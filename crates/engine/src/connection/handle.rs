//! Application-facing connection handles
//!
//! A [`ConnectionHandle`] stands in for the session in application code. It
//! owns no session itself: every persistence call is routed to the session
//! of the managed connection the handle is currently associated with.
//!
//! ## Lifecycle
//!
//! ```text
//! issued ──associate──> attached to another managed connection
//!   │
//!   ├── cleanup() on the owner ──> orphaned (owner = none, still open)
//!   │
//!   └── close() / drop ──> closed (terminal)
//! ```
//!
//! The owner is held weakly: the pool manager owns managed connections, the
//! application owns handles.

use super::ManagedConnection;
use crate::transaction::ApplicationLocalTransaction;
use conduit_core::{ConnectorError, HandleId, Result, Session, SessionOperation};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// State shared between a handle and the managed connection tracking it
pub(crate) struct HandleState {
    id: HandleId,
    owner: RwLock<Weak<ManagedConnection>>,
    closed: AtomicBool,
}

impl HandleState {
    pub(crate) fn new(owner: Weak<ManagedConnection>) -> Self {
        Self {
            id: HandleId::new(),
            owner: RwLock::new(owner),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> HandleId {
        self.id
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn owner(&self) -> Option<Arc<ManagedConnection>> {
        self.owner.read().upgrade()
    }

    pub(crate) fn set_owner(&self, owner: Weak<ManagedConnection>) {
        *self.owner.write() = owner;
    }

    pub(crate) fn is_owned_by(&self, connection: &Weak<ManagedConnection>) -> bool {
        Weak::ptr_eq(&self.owner.read(), connection)
    }

    /// Drop the owner, unless the handle has since moved to another connection
    pub(crate) fn detach_from(&self, connection: &Weak<ManagedConnection>) {
        let mut owner = self.owner.write();
        if Weak::ptr_eq(&owner, connection) {
            *owner = Weak::new();
        }
    }

    /// Close the handle
    ///
    /// An attached handle flushes the bound session first, then the owner
    /// fires one connection-closed event. With `force` a flush failure is
    /// logged and the close proceeds; otherwise it aborts the close.
    pub(crate) fn close(&self, force: bool) -> Result<()> {
        if self.is_closed() {
            return Err(ConnectorError::HandleClosed);
        }
        debug!("Closing handle {}", self.id);

        let owner = self.owner();
        if let Some(session) = owner.as_ref().and_then(|o| o.bound_session()) {
            if let Err(e) = session.flush() {
                if !force {
                    return Err(ConnectorError::transaction(SessionOperation::Flush, e));
                }
                warn!("Flush failed while force-closing handle {}: {}", self.id, e);
            }
        }

        // A concurrent close may have won the race while we were flushing
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(ConnectorError::HandleClosed);
        }
        if let Some(owner) = owner {
            owner.notify_closed(self.id);
        }
        Ok(())
    }
}

/// Closable proxy for the session of a managed connection
///
/// Dropping an open handle closes it.
pub struct ConnectionHandle {
    state: Arc<HandleState>,
}

impl ConnectionHandle {
    pub(crate) fn from_state(state: Arc<HandleState>) -> Self {
        Self { state }
    }

    pub(crate) fn state(&self) -> &Arc<HandleState> {
        &self.state
    }

    /// Handle id
    pub fn id(&self) -> HandleId {
        self.state.id()
    }

    /// Whether the handle has been closed
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Whether the handle is associated with a live managed connection
    pub fn is_attached(&self) -> bool {
        self.state.owner().is_some()
    }

    /// Managed connection the handle is associated with
    pub fn connection(&self) -> Option<Arc<ManagedConnection>> {
        self.state.owner()
    }

    /// Session of the associated managed connection
    ///
    /// Binds the session on first use.
    pub fn session(&self) -> Result<Arc<dyn Session>> {
        self.check_status()?.session()
    }

    /// Flush pending work on the session
    pub fn flush(&self) -> Result<()> {
        self.session()?
            .flush()
            .map_err(|e| ConnectorError::transaction(SessionOperation::Flush, e))
    }

    /// Application-demarcated local transaction for this handle
    pub fn local_transaction(&self) -> ApplicationLocalTransaction<'_> {
        ApplicationLocalTransaction::new(self)
    }

    /// Connection metadata (not implemented)
    pub fn metadata(&self) -> Result<()> {
        Err(ConnectorError::Unsupported("connection metadata"))
    }

    /// Record-based interactions (not implemented)
    pub fn create_interaction(&self) -> Result<()> {
        Err(ConnectorError::Unsupported("interactions"))
    }

    /// Result set capabilities (not implemented)
    pub fn result_set_info(&self) -> Result<()> {
        Err(ConnectorError::Unsupported("result set info"))
    }

    /// Close the handle
    ///
    /// Fails with [`ConnectorError::HandleClosed`] when already closed. A
    /// flush failure leaves the handle open and fires no event.
    pub fn close(&self) -> Result<()> {
        self.state.close(false)
    }

    fn check_status(&self) -> Result<Arc<ManagedConnection>> {
        if self.state.is_closed() {
            return Err(ConnectorError::HandleClosed);
        }
        self.state.owner().ok_or(ConnectorError::HandleDetached)
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if self.state.is_closed() {
            return;
        }
        match self.state.close(true) {
            Ok(()) | Err(ConnectorError::HandleClosed) => {}
            Err(e) => warn!("Closing dropped handle {} failed: {}", self.state.id(), e),
        }
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.state.id())
            .field("closed", &self.state.is_closed())
            .field("connection", &self.state.owner().map(|o| o.id()))
            .finish()
    }
}
