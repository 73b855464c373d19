//! The managed connection
//!
//! One `ManagedConnection` owns one session and multiplexes it across many
//! short-lived [`ConnectionHandle`]s. It is the unit the pool manager pools:
//! the manager creates it through the factory, hands out handles, listens for
//! connection-closed events, and finally either cleans it up for reuse or
//! destroys it.
//!
//! ## Session binding
//!
//! The session is opened lazily on first access, authenticated with the
//! credential the connection was created for. `cleanup()` closes and unbinds
//! it so the next use opens a fresh one; `destroy()` closes it for good.
//!
//! ## Invalid state
//!
//! `begin()` on a session without a transaction context logs at `error` and
//! returns `Ok(())`. Such calls happen during teardown races between the
//! container and the application and are absorbed.
//!
//! # Thread Safety
//!
//! Connection state (session slot and handle list) sits behind one mutex
//! that is never held while notifying listeners or while calling into an
//! already-bound session.

use super::events::{ConnectionEvent, ConnectionEventKind, ConnectionEventListener, ListenerSet};
use super::handle::{ConnectionHandle, HandleState};
use crate::factory::ManagedConnectionFactory;
use crate::transaction::{ContainerLocalTransaction, XaBranchResource};
use conduit_core::{
    credentials_compatible, ConnectionId, ConnectorError, Credential, FactoryId, HandleId,
    Result, Session, SessionOperation, Subject,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

/// Mutable state of a managed connection
struct ConnectionState {
    /// Bound session, opened on first use
    session: Option<Arc<dyn Session>>,
    /// Live handles, most recently issued first
    handles: VecDeque<Arc<HandleState>>,
}

/// A pooled physical connection multiplexed across handles
pub struct ManagedConnection {
    id: ConnectionId,
    factory: Arc<ManagedConnectionFactory>,
    credential: Option<Credential>,
    self_ref: Weak<ManagedConnection>,
    state: Mutex<ConnectionState>,
    listeners: ListenerSet,
    local_tx: Mutex<Option<Arc<ContainerLocalTransaction>>>,
    xa_resource: Mutex<Option<Arc<XaBranchResource>>>,
    destroyed: AtomicBool,
}

impl ManagedConnection {
    pub(crate) fn new(
        factory: Arc<ManagedConnectionFactory>,
        credential: Option<Credential>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| ManagedConnection {
            id: ConnectionId::new(),
            factory,
            credential,
            self_ref: self_ref.clone(),
            state: Mutex::new(ConnectionState {
                session: None,
                handles: VecDeque::new(),
            }),
            listeners: ListenerSet::new(),
            local_tx: Mutex::new(None),
            xa_resource: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Connection id
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Credential the connection was created for
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Id of the factory that created this connection
    pub fn factory_id(&self) -> FactoryId {
        self.factory.id()
    }

    /// Whether `destroy()` has run
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    // ========================================================================
    // Handles
    // ========================================================================

    /// Issue a handle for the credential `subject` resolves to
    pub fn get_connection(&self, subject: Option<&Subject>) -> Result<ConnectionHandle> {
        debug!("Obtaining connection for managed connection {}", self.id);
        let requester = self.factory.resolve_credential(subject)?;
        self.issue_handle(requester.as_ref())
    }

    /// Issue a new handle bound to this connection
    ///
    /// Fails with [`ConnectorError::Authorization`] when both the requester
    /// and the connection carry a credential and the two differ. Does not
    /// touch the session.
    pub fn issue_handle(&self, requester: Option<&Credential>) -> Result<ConnectionHandle> {
        if self.is_destroyed() {
            return Err(ConnectorError::ConnectionDestroyed);
        }
        if !credentials_compatible(self.credential.as_ref(), requester) {
            return Err(ConnectorError::Authorization {
                requester: requester.map(|c| c.user_name().to_string()).unwrap_or_default(),
                bound: self
                    .credential
                    .as_ref()
                    .map(|c| c.user_name().to_string())
                    .unwrap_or_default(),
            });
        }

        let state = Arc::new(HandleState::new(self.self_ref.clone()));
        debug!("Instantiating handle {} for managed connection {}", state.id(), self.id);
        self.state.lock().handles.push_front(Arc::clone(&state));
        Ok(ConnectionHandle::from_state(state))
    }

    /// Re-bind an existing handle to this connection
    ///
    /// The handle may belong to another managed connection. Associating a
    /// handle that is already tracked here only refreshes its owner.
    pub fn associate(&self, handle: &ConnectionHandle) {
        debug!("Associating handle {} to managed connection {}", handle.id(), self.id);
        let state = handle.state();
        state.set_owner(self.self_ref.clone());

        let mut inner = self.state.lock();
        if !inner.handles.iter().any(|h| Arc::ptr_eq(h, state)) {
            inner.handles.push_front(Arc::clone(state));
        }
    }

    /// Number of tracked handles, open or closed
    pub fn handle_count(&self) -> usize {
        self.state.lock().handles.len()
    }

    /// Number of tracked handles that are still open and owned here
    pub fn open_handle_count(&self) -> usize {
        self.state
            .lock()
            .handles
            .iter()
            .filter(|h| !h.is_closed() && h.is_owned_by(&self.self_ref))
            .count()
    }

    /// Ids of tracked handles, most recently issued first
    pub fn handle_ids(&self) -> Vec<HandleId> {
        self.state.lock().handles.iter().map(|h| h.id()).collect()
    }

    /// Forget every tracked handle without closing or detaching it
    pub(crate) fn clear_handles(&self) {
        self.state.lock().handles.clear();
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Session of this connection, opened on first use
    pub fn session(&self) -> Result<Arc<dyn Session>> {
        if self.is_destroyed() {
            return Err(ConnectorError::ConnectionDestroyed);
        }
        let mut state = self.state.lock();
        if let Some(session) = &state.session {
            return Ok(Arc::clone(session));
        }
        let session = self
            .factory
            .session_factory()
            .open_session(self.credential.as_ref())
            .map_err(|e| ConnectorError::transaction(SessionOperation::Open, e))?;
        debug!("Bound new session to managed connection {}", self.id);
        state.session = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Session if one is currently bound
    pub(crate) fn bound_session(&self) -> Option<Arc<dyn Session>> {
        self.state.lock().session.clone()
    }

    /// Whether a session is currently bound
    pub fn has_session(&self) -> bool {
        self.state.lock().session.is_some()
    }

    /// Start the session transaction on behalf of the container
    ///
    /// Without a transaction context this logs and returns `Ok(())`.
    /// Otherwise starts the transaction if it is not active yet and notifies
    /// listeners once per live handle.
    pub fn begin(&self) -> Result<()> {
        let session = self.session()?;
        if !session.has_transaction() {
            error!("Invalid state during begin invoke. Transaction is closed.");
            return Ok(());
        }
        debug!("Beginning managed connection {}", self.id);
        if !session.is_active() {
            session.begin().map_err(|e| {
                info!("Exception during begin: {}", e);
                ConnectorError::transaction(SessionOperation::Begin, e)
            })?;
        }
        self.notify_begin();
        Ok(())
    }

    // ========================================================================
    // Pool lifecycle
    // ========================================================================

    /// Reset the connection for reuse by a different logical owner
    ///
    /// Detaches every tracked handle without closing it, closes and unbinds
    /// the session, and discards the transaction coordinators. Calling it
    /// again on a clean connection does nothing.
    pub fn cleanup(&self) -> Result<()> {
        debug!("Cleaning up managed connection {}", self.id);
        let (handles, session) = {
            let mut state = self.state.lock();
            (std::mem::take(&mut state.handles), state.session.take())
        };
        for handle in &handles {
            handle.detach_from(&self.self_ref);
        }
        self.discard_coordinators();

        if let Some(session) = session {
            session
                .close()
                .map_err(|e| ConnectorError::transaction(SessionOperation::Close, e))?;
        }
        Ok(())
    }

    /// Tear the connection down permanently
    ///
    /// Closes every handle still open (one connection-closed event each),
    /// then closes the session. Later calls do nothing; later handle
    /// requests fail with [`ConnectorError::ConnectionDestroyed`].
    pub fn destroy(&self) -> Result<()> {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!("Destroying managed connection {}", self.id);

        let handles: Vec<Arc<HandleState>> = self.state.lock().handles.iter().cloned().collect();
        for handle in handles {
            if !handle.is_closed() && handle.is_owned_by(&self.self_ref) {
                // force-close only fails when someone else closed it first
                let _ = handle.close(true);
            }
        }

        let session = {
            let mut state = self.state.lock();
            state.handles.clear();
            state.session.take()
        };
        self.discard_coordinators();

        if let Some(session) = session {
            session
                .close()
                .map_err(|e| ConnectorError::transaction(SessionOperation::Close, e))?;
        }
        Ok(())
    }

    fn discard_coordinators(&self) {
        *self.local_tx.lock() = None;
        *self.xa_resource.lock() = None;
    }

    // ========================================================================
    // Transaction coordinators
    // ========================================================================

    /// Container-demarcated local transaction, created on first use
    pub fn local_transaction(&self) -> Arc<ContainerLocalTransaction> {
        debug!("Local transaction requested for managed connection {}", self.id);
        let mut slot = self.local_tx.lock();
        Arc::clone(
            slot.get_or_insert_with(|| Arc::new(ContainerLocalTransaction::new(self.self_ref.clone()))),
        )
    }

    /// Distributed branch participant, created on first use
    pub fn xa_resource(&self) -> Arc<XaBranchResource> {
        debug!("XA resource requested for managed connection {}", self.id);
        let mut slot = self.xa_resource.lock();
        Arc::clone(
            slot.get_or_insert_with(|| Arc::new(XaBranchResource::new(self.self_ref.clone()))),
        )
    }

    /// Connection metadata (not implemented)
    pub fn metadata(&self) -> Result<()> {
        Err(ConnectorError::Unsupported("managed connection metadata"))
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Register a listener
    pub fn add_listener(&self, listener: Arc<dyn ConnectionEventListener>) {
        self.listeners.add(listener);
    }

    /// Remove a listener, returning whether it was registered
    pub fn remove_listener(&self, listener: &Arc<dyn ConnectionEventListener>) -> bool {
        self.listeners.remove(listener)
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Fire one connection-closed event for the closing handle
    pub(crate) fn notify_closed(&self, handle: HandleId) {
        if let Some(source) = self.self_ref.upgrade() {
            let event = ConnectionEvent::new(ConnectionEventKind::Closed, source, Some(handle));
            self.listeners.fire(&event);
        }
    }

    pub(crate) fn notify_begin(&self) {
        self.notify_handles(ConnectionEventKind::LocalTransactionStarted);
    }

    pub(crate) fn notify_commit(&self) {
        self.notify_handles(ConnectionEventKind::LocalTransactionCommitted);
    }

    pub(crate) fn notify_rollback(&self) {
        self.notify_handles(ConnectionEventKind::LocalTransactionRolledBack);
    }

    fn notify_handles(&self, kind: ConnectionEventKind) {
        let Some(source) = self.self_ref.upgrade() else {
            return;
        };
        let handles = self.handle_ids();
        for handle in handles {
            let event = ConnectionEvent::new(kind, Arc::clone(&source), Some(handle));
            self.listeners.fire(&event);
        }
    }
}

impl fmt::Debug for ManagedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConnection")
            .field("id", &self.id)
            .field("credential", &self.credential)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
