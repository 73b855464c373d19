//! Local (single-resource) transaction demarcation
//!
//! Two flavours share the begin/commit/rollback surface:
//!
//! - [`ContainerLocalTransaction`]: driven by the container through the
//!   managed connection. Missing transaction context is logged and skipped;
//!   session failures are translated into [`ConnectorError::Transaction`].
//! - [`ApplicationLocalTransaction`]: driven by application code through a
//!   handle. Delegates straight to the session and passes its errors through
//!   unchanged as [`ConnectorError::Session`].
//!
//! Neither tracks transaction state of its own; the session's state is
//! re-read on every call.

use crate::connection::{ConnectionHandle, ManagedConnection};
use conduit_core::{ConnectorError, Result, Session, SessionOperation};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

/// Container-demarcated local transaction of one managed connection
#[derive(Debug)]
pub struct ContainerLocalTransaction {
    connection: Weak<ManagedConnection>,
}

impl ContainerLocalTransaction {
    pub(crate) fn new(connection: Weak<ManagedConnection>) -> Self {
        Self { connection }
    }

    fn connection(&self) -> Result<Arc<ManagedConnection>> {
        self.connection
            .upgrade()
            .ok_or(ConnectorError::ConnectionDestroyed)
    }

    /// Start the transaction unless it is already active
    pub fn begin(&self) -> Result<()> {
        debug!("Local transaction begin");
        let connection = self.connection()?;
        let session = connection.session()?;
        if !has_context(&session, SessionOperation::Begin) {
            return Ok(());
        }
        debug!("Beginning managed connection {}", connection.id());
        if !session.is_active() {
            session
                .begin()
                .map_err(|e| translate(SessionOperation::Begin, e))?;
        }
        Ok(())
    }

    /// Commit the transaction
    ///
    /// On success fires the commit notification and forgets the tracked
    /// handles, which stay open. This also happens when the commit itself
    /// was skipped for lack of a transaction context.
    pub fn commit(&self) -> Result<()> {
        debug!("Local transaction commit");
        let connection = self.connection()?;
        let session = connection.session()?;
        if has_context(&session, SessionOperation::Commit) {
            debug!("Committing managed connection {}", connection.id());
            session
                .commit()
                .map_err(|e| translate(SessionOperation::Commit, e))?;
        }
        connection.notify_commit();
        connection.clear_handles();
        Ok(())
    }

    /// Roll the transaction back
    ///
    /// Fires the rollback notification but, unlike [`commit`](Self::commit),
    /// keeps the tracked handles.
    pub fn rollback(&self) -> Result<()> {
        debug!("Local transaction rollback");
        let connection = self.connection()?;
        let session = connection.session()?;
        if has_context(&session, SessionOperation::Rollback) {
            debug!("Rolling back managed connection {}", connection.id());
            session
                .rollback()
                .map_err(|e| translate(SessionOperation::Rollback, e))?;
        }
        connection.notify_rollback();
        Ok(())
    }
}

fn has_context(session: &Arc<dyn Session>, operation: SessionOperation) -> bool {
    if session.has_transaction() {
        return true;
    }
    error!("Invalid state during {} invoke. Transaction is closed.", operation);
    false
}

fn translate(operation: SessionOperation, e: conduit_core::SessionError) -> ConnectorError {
    info!("Exception during {}: {}", operation, e);
    ConnectorError::transaction(operation, e)
}

/// Application-demarcated local transaction, borrowed from a handle
///
/// Each call resolves the handle's current session, so a handle that was
/// re-associated drives its new connection's session.
#[derive(Debug)]
pub struct ApplicationLocalTransaction<'a> {
    handle: &'a ConnectionHandle,
}

impl<'a> ApplicationLocalTransaction<'a> {
    pub(crate) fn new(handle: &'a ConnectionHandle) -> Self {
        Self { handle }
    }

    /// Begin the session's current transaction
    pub fn begin(&self) -> Result<()> {
        self.handle.session()?.begin()?;
        Ok(())
    }

    /// Commit the session's current transaction
    pub fn commit(&self) -> Result<()> {
        self.handle.session()?.commit()?;
        Ok(())
    }

    /// Roll back the session's current transaction
    pub fn rollback(&self) -> Result<()> {
        self.handle.session()?.rollback()?;
        Ok(())
    }

    /// Whether the session's current transaction is active
    pub fn is_active(&self) -> Result<bool> {
        Ok(self.handle.session()?.is_active())
    }
}
