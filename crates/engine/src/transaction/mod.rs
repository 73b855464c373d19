//! Transaction coordination for managed connections
//!
//! This module provides:
//! - Container-demarcated local transactions (created per managed connection)
//! - Application-demarcated local transactions (borrowed from a handle)
//! - The XA branch participant for externally coordinated two-phase commit
//!
//! # Architecture
//!
//! Coordinators hold a weak reference to their managed connection and keep
//! no transaction state of their own: the session is the single source of
//! truth and is re-read before every action, so work the application did
//! directly on the session never leaves a coordinator out of step.

pub mod local;
pub mod xa;

pub use local::{ApplicationLocalTransaction, ContainerLocalTransaction};
pub use xa::XaBranchResource;
