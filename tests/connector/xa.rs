//! Branch Resource Tests
//!
//! The two-phase-commit participant as a transaction manager drives it.

use crate::*;
use conduit::{SessionOperation, XaErrorCode};

#[test]
fn interleaved_branches_are_independent() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let xa = mc.xa_resource();

    xa.start(&xid(1), XaFlags::TMNOFLAGS).unwrap();
    xa.start(&xid(2), XaFlags::TMJOIN).unwrap();
    xa.commit(&xid(1), true).unwrap();

    assert!(!xa.has_branch(&xid(1)));
    assert!(xa.has_branch(&xid(2)));
    xa.forget(&xid(1)).unwrap();
    assert!(xa.has_branch(&xid(2)));

    let session = sessions.last_session().unwrap();
    assert_eq!(session.count(SessionOperation::Commit), 1);
    assert_eq!(session.count(SessionOperation::Rollback), 0);
}

#[test]
fn end_runs_even_when_flush_fails() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let xa = mc.xa_resource();
    xa.start(&xid(1), XaFlags::TMNOFLAGS).unwrap();
    let session = sessions.last_session().unwrap();
    session.fail_on(SessionOperation::Flush);

    let err = xa.end(&xid(1), XaFlags::TMSUCCESS).unwrap_err();
    assert_eq!(err.code(), XaErrorCode::RmErr);
    assert_eq!(
        session.calls(),
        vec![
            SessionOperation::Begin,
            SessionOperation::Flush,
            SessionOperation::End,
        ]
    );
}

#[test]
fn recover_is_always_empty() {
    let (connector, _) = connector();
    let mc = managed(&connector, None);
    let xa = mc.xa_resource();
    xa.start(&xid(1), XaFlags::TMNOFLAGS).unwrap();
    xa.start(&xid(2), XaFlags::TMNOFLAGS).unwrap();

    assert!(xa.recover(XaFlags::TMNOFLAGS).unwrap().is_empty());
    assert_eq!(xa.active_branches(), 2);
}

#[test]
fn two_phase_flow_votes_ok() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let xa = mc.xa_resource();
    let x = xid(7);

    xa.start(&x, XaFlags::TMNOFLAGS).unwrap();
    mc.issue_handle(None).unwrap().flush().unwrap();
    xa.end(&x, XaFlags::TMSUCCESS).unwrap();
    let vote = xa.prepare(&x).unwrap();
    assert_eq!(vote, Vote::Ok);
    assert_eq!(vote.code(), 0);
    xa.commit(&x, false).unwrap();

    assert_eq!(
        sessions.last_session().unwrap().count(SessionOperation::Commit),
        1
    );
}

#[test]
fn rollback_failure_reports_resource_error() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let xa = mc.xa_resource();
    xa.start(&xid(1), XaFlags::TMNOFLAGS).unwrap();
    sessions.last_session().unwrap().fail_on(SessionOperation::Rollback);

    let err = conduit::Error::from(xa.rollback(&xid(1)).unwrap_err());
    assert_eq!(err.xa_code(), Some(XaErrorCode::RmErr));
    assert!(err.session_error().is_some());
    assert!(!xa.has_branch(&xid(1)));
}

#[test]
fn unknown_branch_is_rejected() {
    let (connector, _) = connector();
    let mc = managed(&connector, None);
    let err = mc.xa_resource().commit(&xid(3), true).unwrap_err();
    assert_eq!(err.code(), XaErrorCode::NotA);
}

#[test]
fn distinct_connections_are_never_the_same_rm() {
    let (connector, _) = connector();
    let a = managed(&connector, None);
    let b = managed(&connector, None);
    assert!(a.xa_resource().is_same_rm(&a.xa_resource()));
    assert!(!a.xa_resource().is_same_rm(&b.xa_resource()));
}

#[test]
fn timeouts_are_not_honored() {
    let (connector, _) = connector();
    let xa = managed(&connector, None).xa_resource();
    assert!(!xa.set_transaction_timeout(60));
    assert_eq!(xa.transaction_timeout(), 0);
}

#[test]
fn branches_on_distinct_xids_run_concurrently() {
    let (connector, sessions) = connector();
    let mc = managed(&connector, None);
    let xa = mc.xa_resource();

    std::thread::scope(|scope| {
        for n in 0..8u8 {
            let xa = Arc::clone(&xa);
            scope.spawn(move || {
                xa.start(&xid(n), XaFlags::TMNOFLAGS).unwrap();
                xa.end(&xid(n), XaFlags::TMSUCCESS).unwrap();
                xa.commit(&xid(n), true).unwrap();
            });
        }
    });

    assert_eq!(xa.active_branches(), 0);
    let session = sessions.last_session().unwrap();
    assert_eq!(session.count(SessionOperation::End), 8);
    assert_eq!(session.count(SessionOperation::Commit), 8);
}
