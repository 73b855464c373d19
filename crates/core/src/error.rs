//! Error types for the connector
//!
//! Three families of errors exist:
//!
//! - [`SessionError`]: raised by the external persistence session. The
//!   connector never constructs one on its own behalf except in test doubles.
//! - [`ConnectorError`]: connector-level failures surfaced to the pool
//!   manager and to the application.
//! - [`XaError`]: failures of the distributed branch participant, carrying an
//!   XA-style error code for the transaction manager.
//!
//! Invalid-state conditions (an operation invoked while the session has no
//! transaction context) are NOT errors. They are logged at `error` level and
//! the operation completes as a no-op.

use crate::xid::Xid;
use std::fmt;
use thiserror::Error;

/// Boxed source error carried by a [`SessionError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Native error of the external persistence session
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SessionError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl SessionError {
    /// Create a session error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a session error wrapping an underlying cause
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The session's message
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Session operation named by a translated error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionOperation {
    /// Opening the session for a managed connection
    Open,
    /// Transaction begin
    Begin,
    /// Transaction commit
    Commit,
    /// Transaction rollback
    Rollback,
    /// Ending the transaction association of a branch
    End,
    /// Flushing pending work
    Flush,
    /// Closing the session
    Close,
}

impl fmt::Display for SessionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionOperation::Open => "open",
            SessionOperation::Begin => "begin",
            SessionOperation::Commit => "commit",
            SessionOperation::Rollback => "rollback",
            SessionOperation::End => "end",
            SessionOperation::Flush => "flush",
            SessionOperation::Close => "close",
        };
        f.write_str(name)
    }
}

/// Connector-level errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Requester credential differs from the one bound to the connection
    #[error("authorization failed: requester {requester} does not match connection credential {bound}")]
    Authorization {
        /// User name of the requester
        requester: String,
        /// User name bound to the managed connection
        bound: String,
    },

    /// The subject carries no credential for this factory
    #[error("no credentials found for managed connection factory {0}")]
    MissingCredential(String),

    /// Session failure during a container-driven operation
    #[error("session {operation} failed: {source}")]
    Transaction {
        /// Operation that failed
        operation: SessionOperation,
        /// Original session error
        #[source]
        source: SessionError,
    },

    /// Session failure passed through unchanged
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Handle used after it was closed
    #[error("connection handle is closed")]
    HandleClosed,

    /// Handle used while not associated with any managed connection
    #[error("connection handle is not associated with a managed connection")]
    HandleDetached,

    /// Managed connection has been destroyed by the pool manager
    #[error("managed connection has been destroyed")]
    ConnectionDestroyed,

    /// Feature not implemented by this connector
    #[error("not supported: {0}")]
    Unsupported(&'static str),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration mutated after the factory started serving connections
    #[error("configuration is frozen once connections have been created")]
    ConfigurationFrozen,
}

impl ConnectorError {
    /// Wrap a session failure for the given operation
    pub fn transaction(operation: SessionOperation, source: SessionError) -> Self {
        ConnectorError::Transaction { operation, source }
    }

    /// Check if this is a credential mismatch
    pub fn is_authorization(&self) -> bool {
        matches!(self, ConnectorError::Authorization { .. })
    }

    /// Check if this error came from the session
    pub fn is_session_failure(&self) -> bool {
        matches!(
            self,
            ConnectorError::Transaction { .. } | ConnectorError::Session(_)
        )
    }

    /// Check if the handle was unusable (closed or orphaned)
    pub fn is_invalid_handle(&self) -> bool {
        matches!(
            self,
            ConnectorError::HandleClosed | ConnectorError::HandleDetached
        )
    }
}

/// Result type for connector operations
pub type Result<T> = std::result::Result<T, ConnectorError>;

/// XA-style error codes reported to the transaction manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XaErrorCode {
    /// XAER_RMERR: resource manager error in the transaction branch
    RmErr,
    /// XAER_NOTA: the xid is not known to this resource
    NotA,
    /// XAER_PROTO: routine invoked in an improper context
    Proto,
    /// XAER_RMFAIL: resource manager unavailable
    RmFail,
}

impl XaErrorCode {
    /// Numeric code as defined by X/Open XA
    pub fn code(&self) -> i32 {
        match self {
            XaErrorCode::RmErr => -3,
            XaErrorCode::NotA => -4,
            XaErrorCode::Proto => -6,
            XaErrorCode::RmFail => -7,
        }
    }
}

impl fmt::Display for XaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            XaErrorCode::RmErr => "XAER_RMERR",
            XaErrorCode::NotA => "XAER_NOTA",
            XaErrorCode::Proto => "XAER_PROTO",
            XaErrorCode::RmFail => "XAER_RMFAIL",
        };
        f.write_str(name)
    }
}

/// Failure of the distributed branch participant
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct XaError {
    code: XaErrorCode,
    message: String,
    #[source]
    source: Option<SessionError>,
}

impl XaError {
    /// Create an error without an underlying cause
    pub fn new(code: XaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Branch operation failed inside the session
    pub fn session(operation: SessionOperation, xid: &Xid, source: SessionError) -> Self {
        Self {
            code: XaErrorCode::RmErr,
            message: format!("branch {} failed for {}", operation, xid),
            source: Some(source),
        }
    }

    /// The xid has no branch registered on this resource
    pub fn unknown_xid(xid: &Xid) -> Self {
        Self::new(XaErrorCode::NotA, format!("unknown transaction branch {}", xid))
    }

    /// The owning managed connection is gone or unusable
    pub fn resource_failure(cause: &ConnectorError) -> Self {
        Self::new(XaErrorCode::RmFail, cause.to_string())
    }

    /// Error code
    pub fn code(&self) -> XaErrorCode {
        self.code
    }

    /// Underlying session error, if any
    pub fn session_error(&self) -> Option<&SessionError> {
        self.source.as_ref()
    }
}

/// Result type for branch operations
pub type XaResult<T> = std::result::Result<T, XaError>;
