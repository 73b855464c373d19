//! The external persistence session capability
//!
//! The connector coordinates a session but never implements one. A session
//! owns its own transaction state; the connector re-reads that state before
//! every operation instead of tracking it separately.
//!
//! ## Transaction context
//!
//! A session may lose its transaction context, typically while it is being
//! torn down concurrently by the container and the application. Callers
//! check [`Session::has_transaction`] first; operations on a session without
//! a context are logged and skipped by the connector.

use crate::config::ConnectorConfig;
use crate::credential::Credential;
use crate::error::SessionResult;
use std::sync::Arc;

/// One open persistence context
///
/// All methods take `&self`: a session is shared between the managed
/// connection, its handles and the branch resource, possibly across
/// threads, so implementations use interior mutability.
pub trait Session: Send + Sync {
    /// Whether a transaction context exists
    fn has_transaction(&self) -> bool;

    /// Whether the current transaction is active
    fn is_active(&self) -> bool;

    /// Start the current transaction
    fn begin(&self) -> SessionResult<()>;

    /// Commit the current transaction
    fn commit(&self) -> SessionResult<()>;

    /// Roll back the current transaction
    fn rollback(&self) -> SessionResult<()>;

    /// End the association of the current transaction with this session
    ///
    /// Called by the branch participant when the transaction manager ends
    /// or suspends a branch.
    fn end(&self) -> SessionResult<()>;

    /// Flush pending work to the store
    fn flush(&self) -> SessionResult<()>;

    /// Close the session, releasing its resources
    fn close(&self) -> SessionResult<()>;

    /// Whether [`Session::close`] has completed
    fn is_closed(&self) -> bool;
}

/// Opens sessions for managed connections
pub trait SessionFactory: Send + Sync {
    /// Apply the connector configuration
    ///
    /// Invoked exactly once, when the managed connection factory freezes its
    /// configuration.
    fn configure(&self, _config: &ConnectorConfig) -> SessionResult<()> {
        Ok(())
    }

    /// Open a session, authenticated with `credential` when present
    fn open_session(&self, credential: Option<&Credential>) -> SessionResult<Arc<dyn Session>>;
}

/// Whether two sessions are the same instance
pub fn same_session(a: &Arc<dyn Session>, b: &Arc<dyn Session>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const u8,
        Arc::as_ptr(b) as *const u8,
    )
}
