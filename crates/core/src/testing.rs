//! Recording session doubles
//!
//! [`RecordingSession`] keeps a log of every call it receives and lets tests
//! inject failures per operation or drop the transaction context.
//! [`RecordingSessionFactory`] hands out recording sessions and remembers
//! each one it opened.

use crate::config::ConnectorConfig;
use crate::credential::Credential;
use crate::error::{SessionError, SessionOperation, SessionResult};
use crate::session::{Session, SessionFactory};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct SessionState {
    has_transaction: bool,
    active: bool,
    closed: bool,
    failing: HashSet<SessionOperation>,
}

/// In-memory session that records its calls
#[derive(Debug)]
pub struct RecordingSession {
    serial: usize,
    credential: Option<Credential>,
    state: Mutex<SessionState>,
    calls: Mutex<Vec<SessionOperation>>,
}

impl RecordingSession {
    /// Create a session with a transaction context and no active transaction
    pub fn new() -> Self {
        Self::with_serial(0, None)
    }

    fn with_serial(serial: usize, credential: Option<Credential>) -> Self {
        Self {
            serial,
            credential,
            state: Mutex::new(SessionState {
                has_transaction: true,
                active: false,
                closed: false,
                failing: HashSet::new(),
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Order in which the factory opened this session, starting at 1
    pub fn serial(&self) -> usize {
        self.serial
    }

    /// Credential the session was opened with
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Make every future call of `op` fail
    pub fn fail_on(&self, op: SessionOperation) {
        self.state.lock().failing.insert(op);
    }

    /// Stop injecting failures
    pub fn clear_failures(&self) {
        self.state.lock().failing.clear();
    }

    /// Add or remove the transaction context
    pub fn set_transaction_context(&self, present: bool) {
        self.state.lock().has_transaction = present;
    }

    /// Force the active flag
    pub fn set_active(&self, active: bool) {
        self.state.lock().active = active;
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<SessionOperation> {
        self.calls.lock().clone()
    }

    /// Number of times `op` was called
    pub fn count(&self, op: SessionOperation) -> usize {
        self.calls.lock().iter().filter(|c| **c == op).count()
    }

    fn record(&self, op: SessionOperation) -> SessionResult<()> {
        self.calls.lock().push(op);
        if self.state.lock().failing.contains(&op) {
            return Err(SessionError::new(format!("injected {} failure", op)));
        }
        Ok(())
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for RecordingSession {
    fn has_transaction(&self) -> bool {
        self.state.lock().has_transaction
    }

    fn is_active(&self) -> bool {
        self.state.lock().active
    }

    fn begin(&self) -> SessionResult<()> {
        self.record(SessionOperation::Begin)?;
        self.state.lock().active = true;
        Ok(())
    }

    fn commit(&self) -> SessionResult<()> {
        self.record(SessionOperation::Commit)?;
        self.state.lock().active = false;
        Ok(())
    }

    fn rollback(&self) -> SessionResult<()> {
        self.record(SessionOperation::Rollback)?;
        self.state.lock().active = false;
        Ok(())
    }

    fn end(&self) -> SessionResult<()> {
        self.record(SessionOperation::End)
    }

    fn flush(&self) -> SessionResult<()> {
        self.record(SessionOperation::Flush)
    }

    fn close(&self) -> SessionResult<()> {
        self.record(SessionOperation::Close)?;
        let mut state = self.state.lock();
        state.closed = true;
        state.active = false;
        state.has_transaction = false;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

/// Session factory handing out [`RecordingSession`]s
#[derive(Debug, Default)]
pub struct RecordingSessionFactory {
    opened: Mutex<Vec<Arc<RecordingSession>>>,
    configured: Mutex<Vec<ConnectorConfig>>,
    next_serial: AtomicUsize,
    fail_open: Mutex<bool>,
    without_context: Mutex<bool>,
}

impl RecordingSessionFactory {
    /// Create a factory
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future `open_session` calls fail
    pub fn fail_open(&self, fail: bool) {
        *self.fail_open.lock() = fail;
    }

    /// Open future sessions without a transaction context
    pub fn open_without_transaction_context(&self, without: bool) {
        *self.without_context.lock() = without;
    }

    /// Every session opened so far, oldest first
    pub fn sessions(&self) -> Vec<Arc<RecordingSession>> {
        self.opened.lock().clone()
    }

    /// Most recently opened session
    pub fn last_session(&self) -> Option<Arc<RecordingSession>> {
        self.opened.lock().last().cloned()
    }

    /// Number of sessions opened
    pub fn opened_count(&self) -> usize {
        self.opened.lock().len()
    }

    /// Configurations received through [`SessionFactory::configure`]
    pub fn configurations(&self) -> Vec<ConnectorConfig> {
        self.configured.lock().clone()
    }
}

impl SessionFactory for RecordingSessionFactory {
    fn configure(&self, config: &ConnectorConfig) -> SessionResult<()> {
        self.configured.lock().push(config.clone());
        Ok(())
    }

    fn open_session(&self, credential: Option<&Credential>) -> SessionResult<Arc<dyn Session>> {
        if *self.fail_open.lock() {
            return Err(SessionError::new("injected open failure"));
        }
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst) + 1;
        let session = Arc::new(RecordingSession::with_serial(serial, credential.cloned()));
        if *self.without_context.lock() {
            session.set_transaction_context(false);
        }
        self.opened.lock().push(Arc::clone(&session));
        Ok(session)
    }
}
