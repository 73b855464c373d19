//! Local Transaction Tests
//!
//! Container- and application-demarcated local transactions.

use crate::*;
use conduit::{ConnectorError, SessionOperation};

#[test]
fn container_transaction_round_trip() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let handle = mc.issue_handle(None).unwrap();
    let tx = mc.local_transaction();

    tx.begin().unwrap();
    assert!(handle.local_transaction().is_active().unwrap());
    tx.commit().unwrap();

    let session = sessions.last_session().unwrap();
    assert_eq!(
        session.calls(),
        vec![SessionOperation::Begin, SessionOperation::Commit]
    );
}

#[test]
fn coordinator_rereads_session_state() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let handle = mc.issue_handle(None).unwrap();

    // the application started the transaction on its own
    handle.local_transaction().begin().unwrap();
    mc.local_transaction().begin().unwrap();
    assert_eq!(
        sessions.last_session().unwrap().count(SessionOperation::Begin),
        1
    );
}

#[test]
fn commit_clears_bookkeeping_but_rollback_does_not() {
    let (connector, _) = connector();
    let mc = managed(&connector, None);
    let log = EventLog::attach(&mc);
    let handle = mc.issue_handle(None).unwrap();
    let tx = mc.local_transaction();

    tx.begin().unwrap();
    tx.rollback().unwrap();
    assert_eq!(mc.handle_ids(), vec![handle.id()]);
    assert_eq!(log.count(ConnectionEventKind::LocalTransactionRolledBack), 1);

    tx.begin().unwrap();
    tx.commit().unwrap();
    assert!(mc.handle_ids().is_empty());
    assert_eq!(log.count(ConnectionEventKind::LocalTransactionCommitted), 1);

    // handles stay usable after the bookkeeping reset
    assert!(!handle.is_closed());
    handle.flush().unwrap();
}

#[test]
fn managed_connection_begin_notifies_live_handles() {
    let (connector, _) = connector();
    let mc = managed(&connector, None);
    let log = EventLog::attach(&mc);
    let _a = mc.issue_handle(None).unwrap();
    let _b = mc.issue_handle(None).unwrap();

    mc.begin().unwrap();
    assert_eq!(log.count(ConnectionEventKind::LocalTransactionStarted), 2);
}

#[test]
fn container_failures_are_translated() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    mc.session().unwrap();
    let session = sessions.last_session().unwrap();
    let tx = mc.local_transaction();

    session.fail_on(SessionOperation::Rollback);
    match tx.rollback().unwrap_err() {
        ConnectorError::Transaction { operation, source } => {
            assert_eq!(operation, SessionOperation::Rollback);
            assert!(source.message().contains("rollback"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn application_failures_pass_through_unchanged() {
    let (connector, sessions) = connector();
    let handle = connector.get_connection().unwrap();
    handle.session().unwrap();
    sessions.last_session().unwrap().fail_on(SessionOperation::Begin);

    let err = handle.local_transaction().begin().unwrap_err();
    assert!(matches!(err, ConnectorError::Session(_)));
}

#[test]
fn application_transaction_has_no_noop_policy() {
    let (connector, sessions) = connector();
    sessions.open_without_transaction_context(true);
    let handle = connector.get_connection().unwrap();

    handle.local_transaction().begin().unwrap();
    assert_eq!(
        sessions.last_session().unwrap().count(SessionOperation::Begin),
        1
    );
}
