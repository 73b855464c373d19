//! Connection multiplexing and transaction coordination engine
//!
//! This crate implements the state machines between the pool manager and
//! the persistence session:
//! - ManagedConnection: owns one session, issues and tracks handles
//! - ConnectionHandle: the application's proxy for the session
//! - ContainerLocalTransaction / ApplicationLocalTransaction: local
//!   transaction demarcation
//! - XaBranchResource: two-phase-commit participant
//! - ManagedConnectionFactory: connection creation and matching
//! - ConnectionManager: the pool manager seam, with an unpooled default

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod factory;
pub mod manager;
pub mod transaction;


pub use connection::{
    ConnectionEvent, ConnectionEventKind, ConnectionEventListener, ConnectionHandle,
    ManagedConnection,
};
pub use factory::ManagedConnectionFactory;
pub use manager::{ConnectionFactory, ConnectionManager, DirectConnectionManager};
pub use transaction::{ApplicationLocalTransaction, ContainerLocalTransaction, XaBranchResource};
