//! Managed connection factory
//!
//! Creates managed connections, resolves the credential a request runs
//! under, and lets the pool manager pick a reusable connection for a new
//! request.
//!
//! ## Configuration freeze
//!
//! The configuration can be edited until the factory first serves: creating
//! a managed connection or an application-facing connection factory freezes
//! it and hands it to the session factory exactly once. Later edits fail
//! with [`ConnectorError::ConfigurationFrozen`].

use crate::connection::ManagedConnection;
use crate::manager::{ConnectionFactory, ConnectionManager};
use conduit_core::{
    ConnectorConfig, ConnectorError, Credential, FactoryId, Result, SessionFactory,
    SessionOperation, Subject,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

struct FactoryConfig {
    config: ConnectorConfig,
    frozen: bool,
}

/// Factory for managed connections sharing one session factory
pub struct ManagedConnectionFactory {
    id: FactoryId,
    sessions: Arc<dyn SessionFactory>,
    config: Mutex<FactoryConfig>,
}

impl ManagedConnectionFactory {
    /// Create a factory
    pub fn new(config: ConnectorConfig, sessions: Arc<dyn SessionFactory>) -> Arc<Self> {
        Arc::new(Self {
            id: FactoryId::new(),
            sessions,
            config: Mutex::new(FactoryConfig {
                config,
                frozen: false,
            }),
        })
    }

    /// Factory id
    pub fn id(&self) -> FactoryId {
        self.id
    }

    pub(crate) fn session_factory(&self) -> &Arc<dyn SessionFactory> {
        &self.sessions
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Snapshot of the current configuration
    pub fn config(&self) -> ConnectorConfig {
        self.config.lock().config.clone()
    }

    /// Whether the configuration has been frozen
    pub fn is_frozen(&self) -> bool {
        self.config.lock().frozen
    }

    /// Set the persistence unit name
    pub fn set_persistence_unit_name(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.update(|c| c.persistence_unit_name = Some(name))
    }

    /// Set the persistence descriptor location
    pub fn set_persistence_xml_filename(&self, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.update(|c| c.persistence_xml_filename = Some(path))
    }

    /// Set the default credential for requests without a subject
    pub fn set_connection_credentials(
        &self,
        user_name: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<()> {
        let (user_name, password) = (user_name.into(), password.into());
        self.update(|c| {
            c.connection_user_name = Some(user_name);
            c.connection_password = Some(password);
        })
    }

    /// Set a free-form property
    pub fn set_property(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        self.update(|c| {
            c.properties.insert(key, value);
        })
    }

    fn update(&self, apply: impl FnOnce(&mut ConnectorConfig)) -> Result<()> {
        let mut guard = self.config.lock();
        if guard.frozen {
            return Err(ConnectorError::ConfigurationFrozen);
        }
        apply(&mut guard.config);
        Ok(())
    }

    fn freeze(&self) -> Result<()> {
        let mut guard = self.config.lock();
        if guard.frozen {
            return Ok(());
        }
        self.sessions
            .configure(&guard.config)
            .map_err(|e| ConnectorError::transaction(SessionOperation::Open, e))?;
        guard.frozen = true;
        debug!("Froze configuration of managed connection factory {}", self.id);
        Ok(())
    }

    // ========================================================================
    // Connections
    // ========================================================================

    /// Credential a request runs under
    ///
    /// Without a subject this is the configured default credential (user
    /// name and password both required, otherwise none). With a subject it
    /// is the credential the subject holds for this factory; a subject
    /// holding none fails with [`ConnectorError::MissingCredential`].
    pub fn resolve_credential(&self, subject: Option<&Subject>) -> Result<Option<Credential>> {
        match subject {
            None => Ok(self.config.lock().config.default_credential()),
            Some(subject) => subject
                .credential_for(self.id)
                .cloned()
                .map(Some)
                .ok_or_else(|| ConnectorError::MissingCredential(self.id.to_string())),
        }
    }

    /// Create a managed connection for the credential `subject` resolves to
    pub fn create_managed_connection(
        self: &Arc<Self>,
        subject: Option<&Subject>,
    ) -> Result<Arc<ManagedConnection>> {
        self.freeze()?;
        let credential = self.resolve_credential(subject)?;
        let connection = ManagedConnection::new(Arc::clone(self), credential);
        debug!(
            "Created managed connection {} from factory {}",
            connection.id(),
            self.id
        );
        Ok(connection)
    }

    /// Pick a connection from `candidates` that can serve `subject`
    ///
    /// A candidate matches when this factory created it, it is not
    /// destroyed, and its credential equals the resolved one (both absent
    /// also matches). Returns the first match in candidate order.
    pub fn match_managed_connections(
        &self,
        candidates: &[Arc<ManagedConnection>],
        subject: Option<&Subject>,
    ) -> Result<Option<Arc<ManagedConnection>>> {
        let credential = self.resolve_credential(subject)?;
        Ok(candidates
            .iter()
            .filter(|c| c.factory_id() == self.id && !c.is_destroyed())
            .find(|c| c.credential() == credential.as_ref())
            .cloned())
    }

    /// Application-facing connection factory allocating through `manager`
    pub fn create_connection_factory(
        self: &Arc<Self>,
        manager: Arc<dyn ConnectionManager>,
    ) -> Result<ConnectionFactory> {
        self.freeze()?;
        Ok(ConnectionFactory::new(Arc::clone(self), manager))
    }
}

impl fmt::Debug for ManagedConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedConnectionFactory")
            .field("id", &self.id)
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
