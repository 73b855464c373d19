//! Handle Lifecycle Tests
//!
//! Issuance, association, close and the connection-closed event contract.

use crate::*;
use conduit::{ConnectorError, SessionOperation};

// ============================================================================
// Issuance
// ============================================================================

#[test]
fn freshest_handle_is_tracked_first() {
    let (connector, _) = connector();
    let mc = managed(&connector, None);
    let handles: Vec<_> = (0..3).map(|_| mc.issue_handle(None).unwrap()).collect();
    let newest_first: Vec<_> = handles.iter().rev().map(|h| h.id()).collect();
    assert_eq!(mc.handle_ids(), newest_first);
}

#[test]
fn issuing_a_handle_leaves_the_session_unopened() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let handle = mc.get_connection(None).unwrap();
    assert_eq!(sessions.opened_count(), 0);

    handle.session().unwrap();
    assert_eq!(sessions.opened_count(), 1);
}

#[test]
fn get_connection_checks_subject_against_bound_credential() {
    let (connector, _) = connector();
    let alice = subject_for(&connector, "alice");
    let bob = subject_for(&connector, "bob");
    let mc = managed(&connector, Some(&alice));

    assert!(mc.get_connection(Some(&alice)).is_ok());
    assert!(mc.get_connection(Some(&bob)).unwrap_err().is_authorization());
}

// ============================================================================
// Close
// ============================================================================

#[test]
fn double_close_fires_one_event() {
    let (connector, _) = connector();
    let mc = managed(&connector, None);
    let log = EventLog::attach(&mc);
    let handle = mc.issue_handle(None).unwrap();

    handle.close().unwrap();
    assert!(matches!(handle.close(), Err(ConnectorError::HandleClosed)));
    assert_eq!(
        log.events(),
        vec![(ConnectionEventKind::Closed, Some(handle.id()))]
    );
}

#[test]
fn each_close_is_its_own_reuse_signal() {
    let (connector, _) = connector();
    let mc = managed(&connector, None);
    let log = EventLog::attach(&mc);
    let first = mc.issue_handle(None).unwrap();
    let second = mc.issue_handle(None).unwrap();

    first.close().unwrap();
    assert_eq!(log.count(ConnectionEventKind::Closed), 1);
    assert!(!second.is_closed());
    second.close().unwrap();
    assert_eq!(log.count(ConnectionEventKind::Closed), 2);
}

#[test]
fn flush_failure_during_close_keeps_handle_open() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let log = EventLog::attach(&mc);
    let handle = mc.issue_handle(None).unwrap();
    handle.session().unwrap();
    let session = sessions.last_session().unwrap();
    session.fail_on(SessionOperation::Flush);

    assert!(handle.close().unwrap_err().is_session_failure());
    assert!(!handle.is_closed());
    assert!(log.events().is_empty());

    session.clear_failures();
    handle.close().unwrap();
    assert_eq!(log.count(ConnectionEventKind::Closed), 1);
}

#[test]
fn concurrent_closes_fire_at_most_one_event() {
    let (connector, _) = connector();
    let mc = managed(&connector, None);
    let log = EventLog::attach(&mc);
    let handle = Arc::new(mc.issue_handle(None).unwrap());
    handle.session().unwrap();

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let handle = Arc::clone(&handle);
            std::thread::spawn(move || handle.close().is_ok())
        })
        .collect();
    let successes = threads
        .into_iter()
        .map(|t| t.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(log.count(ConnectionEventKind::Closed), 1);
}

#[test]
fn dropping_an_open_handle_closes_it() {
    let (connector, _) = connector();
    let mc = managed(&connector, None);
    let log = EventLog::attach(&mc);
    {
        let _handle = mc.issue_handle(None).unwrap();
    }
    assert_eq!(log.count(ConnectionEventKind::Closed), 1);
    assert_eq!(mc.open_handle_count(), 0);
}

// ============================================================================
// Association
// ============================================================================

#[test]
fn associated_handle_moves_to_the_new_connection() {
    let (connector, _) = connector();
    let from = managed(&connector, None);
    let to = managed(&connector, None);
    let handle = from.issue_handle(None).unwrap();

    to.associate(&handle);
    to.associate(&handle);
    assert_eq!(handle.connection().unwrap().id(), to.id());
    assert_eq!(to.handle_count(), 1);
    assert!(conduit::same_session(
        &handle.session().unwrap(),
        &to.session().unwrap()
    ));
    assert!(!from.has_session());
}

#[test]
fn orphaned_handle_rejects_work_until_closed() {
    let (connector, _) = connector();
    let mc = managed(&connector, None);
    let log = EventLog::attach(&mc);
    let handle = mc.issue_handle(None).unwrap();
    mc.cleanup().unwrap();

    assert!(!handle.is_attached());
    assert!(matches!(handle.session(), Err(ConnectorError::HandleDetached)));
    handle.close().unwrap();
    assert!(log.events().is_empty());
}
