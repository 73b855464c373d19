//! Managed connections, their handles and their events
//!
//! - [`ManagedConnection`]: owns the session and multiplexes it
//! - [`ConnectionHandle`]: the application's proxy for the session
//! - [`ConnectionEvent`] / [`ConnectionEventListener`]: notifications back
//!   to the pool manager

mod events;
mod handle;
mod managed;

pub use events::{ConnectionEvent, ConnectionEventKind, ConnectionEventListener};
pub use handle::ConnectionHandle;
pub use managed::ManagedConnection;
