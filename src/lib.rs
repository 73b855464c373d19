//! # Conduit
//!
//! Connection multiplexing and transaction coordination between a pool
//! manager and a persistence session.
//!
//! A pool manager owns [`ManagedConnection`]s. Each one binds a single
//! persistence [`Session`] and hands the application lightweight
//! [`ConnectionHandle`]s. Transactions on that session are demarcated by the
//! container ([`ContainerLocalTransaction`]), by the application
//! ([`ApplicationLocalTransaction`]), or by an external transaction manager
//! through the two-phase-commit participant ([`XaBranchResource`]).
//!
//! ## Quick Start
//!
//! ```ignore
//! use conduit::prelude::*;
//!
//! let connector = Connector::builder()
//!     .persistence_unit("orders")
//!     .session_factory(sessions)
//!     .open()?;
//!
//! let handle = connector.get_connection()?;
//! let tx = handle.local_transaction();
//! tx.begin()?;
//! // ... work on handle.session()?
//! tx.commit()?;
//! handle.close()?;
//! ```
//!
//! ## Crates
//!
//! - `conduit-core`: errors, credentials, identifiers, configuration and the
//!   session capability traits
//! - `conduit-engine`: managed connections, handles, transaction
//!   coordinators, the managed connection factory and the pool manager seam

#![warn(missing_docs)]

mod connector;
mod error;

pub mod prelude;

// Re-export main entry points
pub use connector::{Connector, ConnectorBuilder};
pub use error::{Error, Result};

// Re-export the engine surface
pub use conduit_engine::{
    ApplicationLocalTransaction, ConnectionEvent, ConnectionEventKind, ConnectionEventListener,
    ConnectionFactory, ConnectionHandle, ConnectionManager, ContainerLocalTransaction,
    DirectConnectionManager, ManagedConnection, ManagedConnectionFactory, XaBranchResource,
};

// Re-export core types
pub use conduit_core::{
    credentials_compatible, same_session, ConnectionId, ConnectorConfig, ConnectorError,
    Credential, FactoryId, HandleId, Session, SessionError, SessionFactory, SessionOperation,
    SessionResult, Subject, TransactionType, Vote, XaError, XaErrorCode, XaFlags, Xid,
};
