//! Unified error type for Conduit.
//!
//! This module wraps the connector-level and branch-level errors into one
//! type for callers that drive both.

use conduit_core::{ConnectorError, SessionError, XaError, XaErrorCode};
use thiserror::Error;

/// All Conduit errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Connection, handle, local transaction or configuration failure
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// Distributed transaction branch failure
    #[error(transparent)]
    Branch(#[from] XaError),
}

/// Result type for Conduit operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this is a credential mismatch.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Error::Connector(e) if e.is_authorization())
    }

    /// Check if a closed or orphaned handle was used.
    pub fn is_invalid_handle(&self) -> bool {
        matches!(self, Error::Connector(e) if e.is_invalid_handle())
    }

    /// Check if the session reported the failure.
    pub fn is_session_failure(&self) -> bool {
        match self {
            Error::Connector(e) => e.is_session_failure(),
            Error::Branch(e) => e.session_error().is_some(),
        }
    }

    /// Check if the configuration was rejected.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::Connector(ConnectorError::Config(_) | ConnectorError::ConfigurationFrozen)
        )
    }

    /// Branch error code, for branch failures.
    pub fn xa_code(&self) -> Option<XaErrorCode> {
        match self {
            Error::Branch(e) => Some(e.code()),
            Error::Connector(_) => None,
        }
    }

    /// The session's own error, when the session reported the failure.
    pub fn session_error(&self) -> Option<&SessionError> {
        match self {
            Error::Connector(ConnectorError::Transaction { source, .. })
            | Error::Connector(ConnectorError::Session(source)) => Some(source),
            Error::Branch(e) => e.session_error(),
            Error::Connector(_) => None,
        }
    }
}

impl From<SessionError> for Error {
    fn from(e: SessionError) -> Self {
        Error::Connector(ConnectorError::Session(e))
    }
}
