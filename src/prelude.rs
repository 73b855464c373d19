//! Convenient imports for Conduit.
//!
//! ```ignore
//! use conduit::prelude::*;
//!
//! let connector = Connector::builder().session_factory(sessions).open()?;
//! let handle = connector.get_connection()?;
//! ```

// Main entry point
pub use crate::connector::{Connector, ConnectorBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Connections and transactions
pub use conduit_engine::{
    ApplicationLocalTransaction, ConnectionEvent, ConnectionEventKind, ConnectionEventListener,
    ConnectionFactory, ConnectionHandle, ConnectionManager, ContainerLocalTransaction,
    ManagedConnection, ManagedConnectionFactory, XaBranchResource,
};

// Core types
pub use conduit_core::{
    ConnectorConfig, Credential, Session, SessionFactory, Subject, TransactionType, Vote,
    XaFlags, Xid,
};
