//! Distributed transaction branch participant
//!
//! `XaBranchResource` lets one managed connection take part in externally
//! coordinated two-phase commit. Each branch the transaction manager starts
//! is keyed by its [`Xid`] and pinned to the session that was bound when the
//! branch started, so the connection can serve several global transactions
//! over its lifetime, one after another.
//!
//! ## Protocol
//!
//! ```text
//! start(xid) ──> end(xid, TMSUCCESS|TMSUSPEND) ──> prepare(xid) ──> commit(xid)
//!                                                       └──────────> rollback(xid)
//! forget(xid) drops the entry without touching the session
//! ```
//!
//! ## Limitations
//!
//! - `prepare` always votes [`Vote::Ok`] without making anything durable;
//!   the participant trusts the coordinator's outcome.
//! - No recovery log: `recover` always returns an empty list.
//! - Transaction timeouts are not supported.
//!
//! # Thread Safety
//!
//! The branch map is a `DashMap`: distinct xids never contend. Calls for the
//! same xid are serialized by the transaction manager's protocol. Sessions
//! are cloned out of the map before they are called, so no shard lock is
//! held across a session call.

use crate::connection::ManagedConnection;
use conduit_core::{
    ConnectorError, Session, SessionError, SessionOperation, Vote, XaError, XaFlags, XaResult,
    Xid,
};
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

/// Two-phase-commit participant of one managed connection
pub struct XaBranchResource {
    connection: Weak<ManagedConnection>,
    branches: DashMap<Xid, Arc<dyn Session>>,
}

impl XaBranchResource {
    pub(crate) fn new(connection: Weak<ManagedConnection>) -> Self {
        Self {
            connection,
            branches: DashMap::new(),
        }
    }

    /// Number of branches started and not yet completed or forgotten
    pub fn active_branches(&self) -> usize {
        self.branches.len()
    }

    /// Whether a branch is registered for `xid`
    pub fn has_branch(&self, xid: &Xid) -> bool {
        self.branches.contains_key(xid)
    }

    /// Start work on behalf of a branch
    ///
    /// Pins the connection's current session to `xid`, then starts its
    /// transaction if needed. A session without transaction context is
    /// logged and left alone.
    pub fn start(&self, xid: &Xid, flags: XaFlags) -> XaResult<()> {
        debug!("Starting XA resource of transaction {} with flags {}", xid, flags);
        let session = self
            .connection()
            .and_then(|c| c.session())
            .map_err(|e| XaError::resource_failure(&e))?;
        self.branches.insert(xid.clone(), Arc::clone(&session));

        if !session.has_transaction() {
            error!("Invalid state during begin invoke. Transaction is closed.");
            return Ok(());
        }
        if !session.is_active() {
            session
                .begin()
                .map_err(|e| XaError::session(SessionOperation::Begin, xid, e))?;
        }
        Ok(())
    }

    /// End the association of a branch
    ///
    /// Only exactly `TMSUCCESS` or exactly `TMSUSPEND` do work: the branch
    /// session is flushed and its transaction association ended. Any other
    /// combination, including one carrying `TMFAIL`, leaves the branch
    /// untouched. The end call is made even when the flush fails; the flush
    /// failure is then reported.
    pub fn end(&self, xid: &Xid, flags: XaFlags) -> XaResult<()> {
        debug!("Ending XA resource of transaction {} with flags {}", xid, flags);
        if flags != XaFlags::TMSUCCESS && flags != XaFlags::TMSUSPEND {
            return Ok(());
        }
        let session = self.branch_session(xid)?;

        let flushed = session.flush();
        let ended = session.end();
        match (flushed, ended) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(flush), Ok(())) => Err(XaError::session(SessionOperation::Flush, xid, flush)),
            (Err(flush), Err(end)) => {
                warn!("Ending transaction {} failed after flush failure: {}", xid, end);
                Err(XaError::session(SessionOperation::Flush, xid, flush))
            }
            (Ok(()), Err(end)) => Err(XaError::session(SessionOperation::End, xid, end)),
        }
    }

    /// Vote on the branch outcome
    ///
    /// Always votes [`Vote::Ok`]: nothing is made durable here.
    pub fn prepare(&self, xid: &Xid) -> XaResult<Vote> {
        debug!("Preparing XA resource of transaction {}", xid);
        Ok(Vote::Ok)
    }

    /// Commit a branch and drop it from the map
    pub fn commit(&self, xid: &Xid, one_phase: bool) -> XaResult<()> {
        debug!("Committing XA resource of transaction {} - one-phase: {}", xid, one_phase);
        let session = self.take_branch(xid)?;
        if !session.has_transaction() {
            error!("Invalid state during commit invoke. Transaction is closed.");
            return Ok(());
        }
        session
            .commit()
            .map_err(|e| branch_failure(SessionOperation::Commit, xid, e))
    }

    /// Roll a branch back and drop it from the map
    pub fn rollback(&self, xid: &Xid) -> XaResult<()> {
        debug!("Rolling back XA resource of transaction {}", xid);
        let session = self.take_branch(xid)?;
        if !session.has_transaction() {
            error!("Invalid state during rollback invoke. Transaction is closed.");
            return Ok(());
        }
        session
            .rollback()
            .map_err(|e| branch_failure(SessionOperation::Rollback, xid, e))
    }

    /// Drop a branch without touching its session
    ///
    /// Used after heuristic outcomes. Unknown xids are ignored.
    pub fn forget(&self, xid: &Xid) -> XaResult<()> {
        debug!("Forgetting XA resource of transaction {}", xid);
        self.branches.remove(xid);
        Ok(())
    }

    /// Prepared branches awaiting recovery; always empty
    pub fn recover(&self, flags: XaFlags) -> XaResult<Vec<Xid>> {
        debug!("Recovering XA resource with flags {}", flags);
        Ok(Vec::new())
    }

    /// Whether `other` is this very resource
    ///
    /// Resources of distinct managed connections are never interchangeable.
    pub fn is_same_rm(&self, other: &XaBranchResource) -> bool {
        std::ptr::eq(self, other)
    }

    /// Transaction timeout in seconds; 0 means none
    pub fn transaction_timeout(&self) -> u32 {
        0
    }

    /// Request a transaction timeout; never honored
    pub fn set_transaction_timeout(&self, seconds: u32) -> bool {
        debug!(
            "Setting XA resource transaction timeout to {} seconds, however transaction timeout is not supported.",
            seconds
        );
        false
    }

    fn connection(&self) -> Result<Arc<ManagedConnection>, ConnectorError> {
        self.connection
            .upgrade()
            .ok_or(ConnectorError::ConnectionDestroyed)
    }

    fn branch_session(&self, xid: &Xid) -> XaResult<Arc<dyn Session>> {
        self.branches
            .get(xid)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| XaError::unknown_xid(xid))
    }

    fn take_branch(&self, xid: &Xid) -> XaResult<Arc<dyn Session>> {
        self.branches
            .remove(xid)
            .map(|(_, session)| session)
            .ok_or_else(|| XaError::unknown_xid(xid))
    }
}

fn branch_failure(operation: SessionOperation, xid: &Xid, e: SessionError) -> XaError {
    info!("Exception during {}: {}", operation, e);
    XaError::session(operation, xid, e)
}

impl fmt::Debug for XaBranchResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XaBranchResource")
            .field("connection", &self.connection.upgrade().map(|c| c.id()))
            .field("active_branches", &self.branches.len())
            .finish()
    }
}
