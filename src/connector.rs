//! Main entry point for Conduit.
//!
//! This module provides the `Connector` struct, which bundles a managed
//! connection factory with the application-facing connection factory that
//! allocates through a pool manager.

use crate::error::{Error, Result};
use conduit_core::{
    ConnectorConfig, ConnectorError, FactoryId, SessionFactory, Subject, TransactionType,
};
use conduit_engine::{
    ConnectionFactory, ConnectionHandle, ConnectionManager, DirectConnectionManager,
    ManagedConnectionFactory,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A configured connector.
///
/// Create one with [`Connector::builder`].
///
/// # Example
///
/// ```ignore
/// use conduit::prelude::*;
///
/// let connector = Connector::builder()
///     .persistence_unit("orders")
///     .credentials("alice", "secret")
///     .session_factory(sessions)
///     .open()?;
///
/// let handle = connector.get_connection()?;
/// let tx = handle.local_transaction();
/// tx.begin()?;
/// tx.commit()?;
/// handle.close()?;
/// ```
#[derive(Debug, Clone)]
pub struct Connector {
    factory: Arc<ManagedConnectionFactory>,
    connections: ConnectionFactory,
}

impl Connector {
    /// Create a builder for connector configuration.
    pub fn builder() -> ConnectorBuilder {
        ConnectorBuilder::new()
    }

    /// Obtain a handle under the configured default credential.
    pub fn get_connection(&self) -> Result<ConnectionHandle> {
        self.connections.get_connection().map_err(Error::from)
    }

    /// Obtain a handle under the credential `subject` holds for this connector.
    ///
    /// The subject must carry a credential registered for [`Connector::id`].
    pub fn get_connection_as(&self, subject: &Subject) -> Result<ConnectionHandle> {
        self.connections.get_connection_as(subject).map_err(Error::from)
    }

    /// Id of the managed connection factory, used to tag subject credentials.
    pub fn id(&self) -> FactoryId {
        self.factory.id()
    }

    /// The managed connection factory, for pool managers.
    pub fn managed_connection_factory(&self) -> &Arc<ManagedConnectionFactory> {
        &self.factory
    }

    /// The application-facing connection factory.
    pub fn connection_factory(&self) -> &ConnectionFactory {
        &self.connections
    }

    /// Snapshot of the (frozen) configuration.
    pub fn config(&self) -> ConnectorConfig {
        self.factory.config()
    }
}

/// Builder for connector configuration.
///
/// Settings apply on top of the base configuration given with
/// [`config`](Self::config) or [`config_file`](Self::config_file), in the
/// order they were made.
///
/// # Example
///
/// ```ignore
/// // From a TOML file, with an explicit pool manager
/// let connector = Connector::builder()
///     .config_file("conduit.toml")
///     .session_factory(sessions)
///     .connection_manager(manager)
///     .open()?;
/// ```
#[derive(Default)]
pub struct ConnectorBuilder {
    config: ConnectorConfig,
    config_file: Option<PathBuf>,
    overrides: Vec<Override>,
    sessions: Option<Arc<dyn SessionFactory>>,
    manager: Option<Arc<dyn ConnectionManager>>,
}

enum Override {
    PersistenceUnit(String),
    PersistenceXml(String),
    Credentials(String, String),
    TransactionType(TransactionType),
    Property(String, String),
}

impl Override {
    fn apply(self, config: &mut ConnectorConfig) {
        match self {
            Override::PersistenceUnit(name) => config.persistence_unit_name = Some(name),
            Override::PersistenceXml(path) => config.persistence_xml_filename = Some(path),
            Override::Credentials(user, password) => {
                config.connection_user_name = Some(user);
                config.connection_password = Some(password);
            }
            Override::TransactionType(kind) => config.transaction_type = kind,
            Override::Property(key, value) => {
                config.properties.insert(key, value);
            }
        }
    }
}

impl ConnectorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` as the base configuration.
    pub fn config(mut self, config: ConnectorConfig) -> Self {
        self.config = config;
        self.config_file = None;
        self
    }

    /// Load the base configuration from a TOML file when opening.
    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the persistence unit name.
    pub fn persistence_unit(mut self, name: impl Into<String>) -> Self {
        self.overrides.push(Override::PersistenceUnit(name.into()));
        self
    }

    /// Set the persistence descriptor location.
    pub fn persistence_xml(mut self, path: impl Into<String>) -> Self {
        self.overrides.push(Override::PersistenceXml(path.into()));
        self
    }

    /// Set the default credential for requests without a subject.
    pub fn credentials(mut self, user_name: impl Into<String>, password: impl Into<String>) -> Self {
        self.overrides
            .push(Override::Credentials(user_name.into(), password.into()));
        self
    }

    /// Set the transaction demarcation mode.
    pub fn transaction_type(mut self, kind: TransactionType) -> Self {
        self.overrides.push(Override::TransactionType(kind));
        self
    }

    /// Set a free-form property forwarded to the session factory.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides
            .push(Override::Property(key.into(), value.into()));
        self
    }

    /// Set the session factory (required).
    pub fn session_factory(mut self, sessions: Arc<dyn SessionFactory>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Allocate through `manager` instead of the unpooled default.
    pub fn connection_manager(mut self, manager: Arc<dyn ConnectionManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Open the connector.
    ///
    /// Loads the configuration file if one was set, applies the builder
    /// settings, and freezes the result.
    pub fn open(self) -> Result<Connector> {
        let sessions = self.sessions.ok_or_else(|| {
            Error::from(ConnectorError::Config("no session factory configured".into()))
        })?;
        let mut config = match &self.config_file {
            Some(path) => ConnectorConfig::load(path)?,
            None => self.config,
        };
        for setting in self.overrides {
            setting.apply(&mut config);
        }

        let manager = self
            .manager
            .unwrap_or_else(|| Arc::new(DirectConnectionManager::new()));
        let factory = ManagedConnectionFactory::new(config, sessions);
        let connections = factory.create_connection_factory(manager)?;
        info!(
            "Opened connector {} for persistence unit {}",
            factory.id(),
            factory
                .config()
                .persistence_unit_name
                .as_deref()
                .unwrap_or("<default>")
        );
        Ok(Connector {
            factory,
            connections,
        })
    }
}
