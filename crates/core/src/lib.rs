//! Core types for the conduit connector
//!
//! This crate defines the foundational types shared by the engine and the
//! public facade:
//! - Error taxonomy: SessionError, ConnectorError, XaError
//! - Credentials and subjects used to authorize handle requests
//! - Identifiers: ConnectionId, HandleId, FactoryId
//! - External transaction identifiers and XA protocol constants
//! - The Session / SessionFactory capability traits (implemented elsewhere)
//! - Configuration model

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod credential;
pub mod error;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod xid;

pub use config::{ConnectorConfig, TransactionType};
pub use credential::{credentials_compatible, Credential, Subject};
pub use error::{
    BoxError, ConnectorError, Result, SessionError, SessionOperation, SessionResult, XaError,
    XaErrorCode, XaResult,
};
pub use session::{same_session, Session, SessionFactory};
pub use types::{ConnectionId, FactoryId, HandleId};
pub use xid::{Vote, XaFlags, Xid};
