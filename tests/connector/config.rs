//! Configuration Tests
//!
//! Builder settings, TOML files and open-time validation.

use crate::*;
use std::io::Write;

#[test]
fn builder_settings_reach_the_session_factory() {
    let (connector, sessions) = connector_from(
        Connector::builder()
            .persistence_unit("orders")
            .persistence_xml("META-INF/orders.xml")
            .transaction_type(TransactionType::ResourceLocal)
            .property("cache", "off"),
    );

    let configured = sessions.configurations();
    assert_eq!(configured.len(), 1);
    assert_eq!(configured[0], connector.config());
    assert_eq!(configured[0].persistence_unit_name.as_deref(), Some("orders"));
    assert_eq!(
        configured[0].persistence_xml_filename.as_deref(),
        Some("META-INF/orders.xml")
    );
    assert_eq!(configured[0].transaction_type, TransactionType::ResourceLocal);
}

#[test]
fn config_file_with_builder_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
persistence_unit_name = "billing"
connection_user_name = "svc"
connection_password = "svc-pw"

[properties]
cache = "on"
"#
    )
    .unwrap();

    let (connector, sessions) = connector_from(
        Connector::builder()
            .config_file(file.path())
            .property("cache", "off"),
    );

    let config = connector.config();
    assert_eq!(config.persistence_unit_name.as_deref(), Some("billing"));
    assert_eq!(config.properties.get("cache").map(String::as_str), Some("off"));

    let handle = connector.get_connection().unwrap();
    handle.session().unwrap();
    assert_eq!(
        sessions.last_session().unwrap().credential(),
        Some(&Credential::new("svc", "svc-pw"))
    );
}

#[test]
fn unknown_keys_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "persistence_unit = \"typo\"").unwrap();

    let sessions = Arc::new(conduit_core::testing::RecordingSessionFactory::new());
    let err = Connector::builder()
        .config_file(file.path())
        .session_factory(sessions)
        .open()
        .unwrap_err();
    assert!(err.is_config());
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let sessions = Arc::new(conduit_core::testing::RecordingSessionFactory::new());
    let err = Connector::builder()
        .config_file(dir.path().join("absent.toml"))
        .session_factory(sessions)
        .open()
        .unwrap_err();
    assert!(err.is_config());
}

#[test]
fn session_factory_is_required() {
    let err = Connector::builder().open().unwrap_err();
    assert!(err.is_config());
}

#[test]
fn partial_default_credential_is_ignored() {
    let (connector, sessions) = connector_from(
        Connector::builder().config(ConnectorConfig {
            connection_user_name: Some("svc".into()),
            ..ConnectorConfig::default()
        }),
    );
    let handle = connector.get_connection().unwrap();
    handle.session().unwrap();
    assert!(sessions.last_session().unwrap().credential().is_none());
}
