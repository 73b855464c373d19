//! Credentials and security subjects
//!
//! A managed connection is bound to at most one [`Credential`] for its whole
//! lifetime. Requests for handles carry the requester's credential, which
//! must match when both sides have one.

use crate::types::FactoryId;
use std::fmt;

/// User name / password pair
///
/// Equality compares both fields. `Debug` and `Display` never print the
/// password.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    user_name: String,
    password: String,
}

impl Credential {
    /// Create a credential
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
        }
    }

    /// User name
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Password
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user_name", &self.user_name)
            .field("password", &"***")
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_name)
    }
}

/// Security subject presented by the pool manager
///
/// Holds private credentials, each registered for a specific managed
/// connection factory.
#[derive(Debug, Clone, Default)]
pub struct Subject {
    credentials: Vec<(FactoryId, Credential)>,
}

impl Subject {
    /// Create an empty subject
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential for a factory
    pub fn with_credential(mut self, factory: FactoryId, credential: Credential) -> Self {
        self.add_credential(factory, credential);
        self
    }

    /// Add a credential for a factory
    pub fn add_credential(&mut self, factory: FactoryId, credential: Credential) {
        self.credentials.push((factory, credential));
    }

    /// First credential registered for the given factory
    pub fn credential_for(&self, factory: FactoryId) -> Option<&Credential> {
        self.credentials
            .iter()
            .find(|(id, _)| *id == factory)
            .map(|(_, c)| c)
    }
}

/// Whether a requester may use a connection bound to `bound`
///
/// Passes when either side is absent or both are equal.
pub fn credentials_compatible(bound: Option<&Credential>, requester: Option<&Credential>) -> bool {
    match (bound, requester) {
        (Some(bound), Some(requester)) => bound == requester,
        _ => true,
    }
}
