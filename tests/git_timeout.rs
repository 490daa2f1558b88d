//! Integration tests for git transfers against a server that never answers
//!
//! libgit2's socket timeouts are process-wide, so these tests live in their
//! own test binary where every resolver uses the same short timeout.

mod common;

use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use bundle_resolver::{
    CancellationToken, ErrorKind, ResolveError, Resolver, ResolverConfig, SourceDescriptor,
};

const TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound for a resolution that must give up after `TIMEOUT`
const GIVE_UP_WITHIN: Duration = Duration::from_secs(30);

/// Accept connections and hold them open without ever responding
fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let mut held: Vec<TcpStream> = Vec::new();
        for stream in listener.incoming().flatten() {
            held.push(stream);
        }
    });
    format!("http://127.0.0.1:{port}/test/test-repo")
}

fn resolver() -> Resolver {
    Resolver::new(ResolverConfig::default().with_timeout(TIMEOUT)).unwrap()
}

/// Resolve on a worker thread so a hang fails the test instead of blocking it
fn resolve_bounded(
    source: SourceDescriptor,
    cancel: CancellationToken,
) -> (bundle_resolver::Result<bundle_resolver::Bundle>, Duration) {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let started = Instant::now();
        let result = resolver().resolve_with_cancel(&source, &cancel);
        let _ = tx.send((result, started.elapsed()));
    });
    rx.recv_timeout(GIVE_UP_WITHIN)
        .expect("resolution did not finish")
}

#[test]
fn test_silent_server_times_out() {
    common::init_tracing();
    let url = silent_server();

    let (result, elapsed) =
        resolve_bounded(SourceDescriptor::git(&url), CancellationToken::new());

    let err = result.unwrap_err();
    match &err {
        ResolveError::TransportTimeout {
            url: failed,
            timeout_secs,
        } => {
            assert_eq!(failed, &url);
            assert_eq!(*timeout_secs, TIMEOUT.as_secs());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(elapsed >= TIMEOUT);
}

#[test]
fn test_cancel_during_transfer() {
    let url = silent_server();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        trigger.cancel();
    });

    let (result, _elapsed) = resolve_bounded(SourceDescriptor::git(&url), cancel);

    let err = result.unwrap_err();
    assert!(matches!(err, ResolveError::Cancelled));
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}
