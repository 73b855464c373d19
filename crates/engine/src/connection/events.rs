//! Connection events and the listener set
//!
//! The pool manager registers listeners on every managed connection it owns.
//! A connection-closed event is its only signal that the connection can be
//! reused; transaction-boundary events are hooks that listeners may ignore.
//!
//! # Thread Safety
//!
//! Registration, removal and fan-out are serialized by one short-held lock.
//! Fan-out clones the listener list under that lock and iterates the private
//! snapshot with the lock released, so listeners may re-enter the connection
//! (including registering or removing listeners) without deadlocking.

use super::ManagedConnection;
use chrono::{DateTime, Utc};
use conduit_core::HandleId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Kind of connection event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEventKind {
    /// A handle was closed by the application
    Closed,
    /// A local transaction began on the connection
    LocalTransactionStarted,
    /// A local transaction committed
    LocalTransactionCommitted,
    /// A local transaction rolled back
    LocalTransactionRolledBack,
}

impl fmt::Display for ConnectionEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionEventKind::Closed => "connection-closed",
            ConnectionEventKind::LocalTransactionStarted => "local-transaction-started",
            ConnectionEventKind::LocalTransactionCommitted => "local-transaction-committed",
            ConnectionEventKind::LocalTransactionRolledBack => "local-transaction-rolled-back",
        };
        f.write_str(name)
    }
}

/// Event delivered to connection listeners
#[derive(Clone)]
pub struct ConnectionEvent {
    kind: ConnectionEventKind,
    source: Arc<ManagedConnection>,
    handle: Option<HandleId>,
    timestamp: DateTime<Utc>,
}

impl ConnectionEvent {
    pub(crate) fn new(
        kind: ConnectionEventKind,
        source: Arc<ManagedConnection>,
        handle: Option<HandleId>,
    ) -> Self {
        Self {
            kind,
            source,
            handle,
            timestamp: Utc::now(),
        }
    }

    /// Event kind
    pub fn kind(&self) -> ConnectionEventKind {
        self.kind
    }

    /// Managed connection that raised the event
    pub fn source(&self) -> &Arc<ManagedConnection> {
        &self.source
    }

    /// Handle the event is about, if any
    pub fn handle(&self) -> Option<HandleId> {
        self.handle
    }

    /// When the event was raised
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl fmt::Debug for ConnectionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionEvent")
            .field("kind", &self.kind)
            .field("source", &self.source.id())
            .field("handle", &self.handle)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

/// Receiver of connection events
///
/// Notifications must not panic; the connector does not model listener
/// failures.
pub trait ConnectionEventListener: Send + Sync {
    /// A handle on the connection was closed
    fn connection_closed(&self, event: &ConnectionEvent);

    /// A local transaction began
    fn local_transaction_started(&self, _event: &ConnectionEvent) {}

    /// A local transaction committed
    fn local_transaction_committed(&self, _event: &ConnectionEvent) {}

    /// A local transaction rolled back
    fn local_transaction_rolled_back(&self, _event: &ConnectionEvent) {}
}

/// Registered listeners of one managed connection
#[derive(Default)]
pub(crate) struct ListenerSet {
    listeners: Mutex<Vec<Arc<dyn ConnectionEventListener>>>,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a listener; registering the same instance twice is a no-op
    pub(crate) fn add(&self, listener: Arc<dyn ConnectionEventListener>) {
        let mut listeners = self.listeners.lock();
        if !listeners.iter().any(|l| same_listener(l, &listener)) {
            listeners.push(listener);
        }
    }

    /// Remove a listener, returning whether it was registered
    pub(crate) fn remove(&self, listener: &Arc<dyn ConnectionEventListener>) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver an event to every listener registered at the time of the call
    pub(crate) fn fire(&self, event: &ConnectionEvent) {
        let snapshot: Vec<Arc<dyn ConnectionEventListener>> = self.listeners.lock().clone();
        for listener in &snapshot {
            match event.kind() {
                ConnectionEventKind::Closed => listener.connection_closed(event),
                ConnectionEventKind::LocalTransactionStarted => {
                    listener.local_transaction_started(event)
                }
                ConnectionEventKind::LocalTransactionCommitted => {
                    listener.local_transaction_committed(event)
                }
                ConnectionEventKind::LocalTransactionRolledBack => {
                    listener.local_transaction_rolled_back(event)
                }
            }
        }
    }
}

fn same_listener(
    a: &Arc<dyn ConnectionEventListener>,
    b: &Arc<dyn ConnectionEventListener>,
) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const u8, Arc::as_ptr(b) as *const u8)
}
