//! Connection allocation
//!
//! The pool manager sits between the application and the managed connection
//! factory. This module defines the seam it plugs into, the
//! application-facing [`ConnectionFactory`] that routes every request
//! through it, and [`DirectConnectionManager`], an unpooled manager for
//! environments without a container.

use crate::connection::{ConnectionEvent, ConnectionEventListener, ConnectionHandle, ManagedConnection};
use crate::factory::ManagedConnectionFactory;
use conduit_core::{ConnectionId, ConnectorError, Result, Subject};
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// The pool manager contract
pub trait ConnectionManager: Send + Sync {
    /// Obtain a handle for a request against `factory`
    fn allocate_connection(
        &self,
        factory: &Arc<ManagedConnectionFactory>,
        subject: Option<&Subject>,
    ) -> Result<ConnectionHandle>;
}

/// Unpooled connection manager
///
/// Creates a managed connection per request and keeps it alive while its
/// handle is open. When the last open handle of a connection closes, the
/// connection is destroyed. Dropping the manager releases every connection
/// it still holds; their open handles become detached.
#[derive(Default)]
pub struct DirectConnectionManager {
    live: Arc<DashMap<ConnectionId, Arc<ManagedConnection>>>,
}

impl DirectConnectionManager {
    /// Create a manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connections with open handles
    pub fn live_connections(&self) -> usize {
        self.live.len()
    }
}

impl ConnectionManager for DirectConnectionManager {
    fn allocate_connection(
        &self,
        factory: &Arc<ManagedConnectionFactory>,
        subject: Option<&Subject>,
    ) -> Result<ConnectionHandle> {
        let connection = factory.create_managed_connection(subject)?;
        connection.add_listener(Arc::new(ReleaseOnClose {
            live: Arc::downgrade(&self.live),
        }));
        let handle = connection.get_connection(subject)?;
        self.live.insert(connection.id(), connection);
        Ok(handle)
    }
}

impl fmt::Debug for DirectConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectConnectionManager")
            .field("live", &self.live.len())
            .finish()
    }
}

/// Destroys a connection once its last open handle closes
struct ReleaseOnClose {
    live: Weak<DashMap<ConnectionId, Arc<ManagedConnection>>>,
}

impl ConnectionEventListener for ReleaseOnClose {
    fn connection_closed(&self, event: &ConnectionEvent) {
        let source = event.source();
        if source.open_handle_count() > 0 {
            return;
        }
        let Some(live) = self.live.upgrade() else {
            return;
        };
        if let Some((id, connection)) = live.remove(&source.id()) {
            debug!("Releasing managed connection {}", id);
            if let Err(e) = connection.destroy() {
                warn!("Destroying managed connection {} failed: {}", id, e);
            }
        }
    }
}

/// Application-facing factory of connection handles
#[derive(Clone)]
pub struct ConnectionFactory {
    factory: Arc<ManagedConnectionFactory>,
    manager: Arc<dyn ConnectionManager>,
}

impl ConnectionFactory {
    pub(crate) fn new(
        factory: Arc<ManagedConnectionFactory>,
        manager: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self { factory, manager }
    }

    /// Obtain a handle under the factory's default credential
    pub fn get_connection(&self) -> Result<ConnectionHandle> {
        self.manager.allocate_connection(&self.factory, None)
    }

    /// Obtain a handle under the credential `subject` holds for this factory
    pub fn get_connection_as(&self, subject: &Subject) -> Result<ConnectionHandle> {
        self.manager.allocate_connection(&self.factory, Some(subject))
    }

    /// Managed connection factory behind this factory
    pub fn managed_connection_factory(&self) -> &Arc<ManagedConnectionFactory> {
        &self.factory
    }

    /// Resource adapter metadata (not implemented)
    pub fn metadata(&self) -> Result<()> {
        Err(ConnectorError::Unsupported("resource adapter metadata"))
    }

    /// Raw properties; not available in a managed environment
    pub fn properties(&self) -> Result<()> {
        Err(ConnectorError::Unsupported(
            "properties are not available in a managed environment",
        ))
    }
}

impl fmt::Debug for ConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("factory", &self.factory.id())
            .finish()
    }
}
