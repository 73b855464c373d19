//! End-to-End Scenarios
//!
//! Pool manager, application and transaction manager interleavings.

use crate::*;
use conduit::SessionOperation;

#[test]
fn credential_bound_connection_reused_after_cleanup() {
    let (connector, sessions) = connector();
    let alice = subject_for(&connector, "alice");
    let bob = Credential::new("bob", "bob-pw");
    let mc = managed(&connector, Some(&alice));

    let first = mc.issue_handle(None).unwrap();
    first.session().unwrap();
    assert!(mc.issue_handle(Some(&bob)).unwrap_err().is_authorization());

    mc.cleanup().unwrap();
    assert_eq!(mc.handle_count(), 0);
    assert!(!first.is_attached());

    let second = mc.issue_handle(None).unwrap();
    second.session().unwrap();
    assert_eq!(sessions.opened_count(), 2);
    let fresh = sessions.last_session().unwrap();
    assert_eq!(fresh.serial(), 2);
    assert_eq!(fresh.credential().map(|c| c.user_name()), Some("alice"));
    assert!(sessions.sessions()[0].is_closed());
}

#[test]
fn cleanup_twice_is_a_noop() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let _handle = mc.issue_handle(None).unwrap();
    mc.session().unwrap();

    mc.cleanup().unwrap();
    mc.cleanup().unwrap();
    assert_eq!(mc.handle_count(), 0);
    assert_eq!(
        sessions.last_session().unwrap().count(SessionOperation::Close),
        1
    );
}

#[test]
fn destroy_closes_everything_once() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let log = EventLog::attach(&mc);
    let a = mc.issue_handle(None).unwrap();
    let b = mc.issue_handle(None).unwrap();
    a.session().unwrap();

    mc.destroy().unwrap();
    mc.destroy().unwrap();

    assert!(a.is_closed() && b.is_closed());
    assert_eq!(log.count(ConnectionEventKind::Closed), 2);
    let session = sessions.last_session().unwrap();
    assert_eq!(session.count(SessionOperation::Close), 1);
    assert!(matches!(
        mc.issue_handle(None),
        Err(conduit::ConnectorError::ConnectionDestroyed)
    ));
}

/// Pool manager returning the connection to the pool on every close
struct ReturnToPool;

impl ConnectionEventListener for ReturnToPool {
    fn connection_closed(&self, event: &ConnectionEvent) {
        event.source().cleanup().unwrap();
    }
}

#[test]
fn listener_may_reenter_the_connection() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    mc.add_listener(Arc::new(ReturnToPool));

    let handle = mc.issue_handle(None).unwrap();
    handle.session().unwrap();
    handle.close().unwrap();

    assert!(!mc.has_session());
    assert!(sessions.last_session().unwrap().is_closed());

    // the pooled connection serves the next request
    let next = mc.issue_handle(None).unwrap();
    next.session().unwrap();
    assert_eq!(sessions.opened_count(), 2);
}

#[test]
fn container_and_branch_work_share_one_session() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let handle = mc.issue_handle(None).unwrap();

    let local = mc.local_transaction();
    local.begin().unwrap();
    local.commit().unwrap();

    let xa = mc.xa_resource();
    xa.start(&xid(1), XaFlags::TMNOFLAGS).unwrap();
    handle.flush().unwrap();
    xa.end(&xid(1), XaFlags::TMSUCCESS).unwrap();
    xa.prepare(&xid(1)).unwrap();
    xa.commit(&xid(1), false).unwrap();

    assert_eq!(sessions.opened_count(), 1);
    assert_eq!(
        sessions.last_session().unwrap().calls(),
        vec![
            SessionOperation::Begin,
            SessionOperation::Commit,
            SessionOperation::Begin,
            SessionOperation::Flush,
            SessionOperation::Flush,
            SessionOperation::End,
            SessionOperation::Commit,
        ]
    );
}

#[test]
fn application_flow_through_connector() {
    let (connector, sessions) = connector_from(
        Connector::builder()
            .persistence_unit("orders")
            .credentials("app", "app-pw"),
    );

    let handle = connector.get_connection().unwrap();
    let tx = handle.local_transaction();
    tx.begin().unwrap();
    handle.flush().unwrap();
    tx.commit().unwrap();
    handle.close().unwrap();

    let session = sessions.last_session().unwrap();
    assert_eq!(session.credential().map(|c| c.user_name()), Some("app"));
    assert!(session.is_closed());
}
