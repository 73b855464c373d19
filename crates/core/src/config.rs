//! Connector configuration
//!
//! Configuration is a flat set of options, usually loaded from a TOML file:
//!
//! ```toml
//! persistence_unit_name = "orders"
//! connection_user_name = "app"
//! connection_password = "secret"
//! transaction_type = "jta"
//!
//! [properties]
//! "datastore.url" = "mem:orders"
//! ```
//!
//! The managed connection factory freezes its configuration when it creates
//! its first connection; see `ManagedConnectionFactory` in the engine.

use crate::credential::Credential;
use crate::error::{ConnectorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// How transactions are demarcated for sessions opened by the connector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Externally coordinated transactions (the managed-environment default)
    #[default]
    Jta,
    /// Single-resource local transactions
    ResourceLocal,
}

/// Configuration for a managed connection factory
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectorConfig {
    /// Name of the persistence unit the sessions belong to
    pub persistence_unit_name: Option<String>,
    /// Location of the persistence descriptor when not on the default path
    pub persistence_xml_filename: Option<String>,
    /// Default user name for connections requested without a subject
    pub connection_user_name: Option<String>,
    /// Default password for connections requested without a subject
    pub connection_password: Option<String>,
    /// Transaction demarcation mode
    pub transaction_type: TransactionType,
    /// Free-form options forwarded to the session factory
    pub properties: BTreeMap<String, String>,
}

impl ConnectorConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| ConnectorError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConnectorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Serialize configuration to TOML text
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| ConnectorError::Config(e.to_string()))
    }

    /// Credential used when a connection is requested without a subject
    ///
    /// Requires both user name and password.
    pub fn default_credential(&self) -> Option<Credential> {
        match (&self.connection_user_name, &self.connection_password) {
            (Some(user), Some(password)) => Some(Credential::new(user.clone(), password.clone())),
            _ => None,
        }
    }
}
