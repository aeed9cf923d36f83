//! Deferred connects and exactly-once resolution events.

use {
    crate::util::*,
    color_eyre::eyre::{bail, ensure, Context},
    pathsock::{ConnectError, ConnectWaitMode, Connector, StreamEvent, StreamSocket},
    std::{sync::mpsc, thread, time::Duration},
};

#[test]
fn resolves_exactly_once() -> TestResult {
    testinit();
    let (path, _listener) = bind_fresh(&mut NameGen::new(make_id!()))?;

    let mut conn = Connector::new().wait_mode(ConnectWaitMode::Deferred);
    let (tx, rx) = mpsc::channel();
    conn.socket_mut().subscribe(tx);

    // Returns promptly whether or not the peer has accepted yet.
    conn.connect_to(&path).context("deferred connect failed")?;
    ensure!(conn.socket().is_attached(), "deferred connect did not hand the descriptor off");

    // Drive the stream the way a reactor would, until the attempt settles.
    let mut settled = false;
    for _ in 0..200 {
        if conn.socket_mut().resolve().context("resolve failed")? {
            settled = true;
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    ensure!(settled, "deferred connect never settled");

    match rx.try_recv() {
        Ok(StreamEvent::Connected) => {}
        other => bail!("expected a Connected event, got {other:?}"),
    }

    // Settlement is terminal: further readiness notifications emit nothing.
    conn.socket_mut().resolve().context("post-settlement resolve failed")?;
    conn.socket_mut().resolve().context("post-settlement resolve failed")?;
    ensure!(rx.try_recv().is_err(), "terminal connect event emitted more than once");

    // Teardown is observable on the same channel, also exactly once.
    conn.socket_mut().release();
    match rx.try_recv() {
        Ok(StreamEvent::Closed) => {}
        other => bail!("expected a Closed event, got {other:?}"),
    }
    conn.socket_mut().release();
    ensure!(rx.try_recv().is_err(), "idempotent release emitted a second Closed event");

    reclaim(&path);
    Ok(())
}

#[test]
fn full_backlog_is_a_synchronous_failure() -> TestResult {
    testinit();
    let (path, listener) = bind_fresh(&mut NameGen::new(make_id!()))?;
    // This test holds a pile of pending connections open, which would skew concurrent
    // descriptor-count measurements.
    let _count_guard = fd_count_lock();

    // Never accept, so pending connections pile up until the kernel stops registering new
    // attempts. Every successful connector is kept alive to hold its backlog slot.
    let mut holders = Vec::new();
    let mut failure = None;
    for _ in 0..300 {
        let mut conn = Connector::new().wait_mode(ConnectWaitMode::Deferred);
        let (tx, rx) = mpsc::channel();
        conn.socket_mut().subscribe(tx);
        match conn.connect_to(&path) {
            Ok(..) => holders.push(conn),
            Err(e) => {
                failure = Some((conn, rx, e));
                break;
            }
        }
    }
    let Some((conn, rx, err)) = failure else {
        // The backlog could not be saturated on this platform; nothing to verify.
        drop(listener);
        reclaim(&path);
        return Ok(());
    };

    // An attempt the kernel never registered must fail synchronously: no descriptor handed
    // off, nothing on the event channel, and an error that marks the attempt as retryable.
    ensure!(!conn.socket().is_attached(), "unregistered connect left a descriptor attached");
    ensure!(rx.try_recv().is_err(), "synchronously failed connect emitted an event");
    match err {
        ConnectError::Other(..) | ConnectError::Refused(..) => {}
        e => bail!("expected a synchronous connect failure, got '{e}'"),
    }

    drop(listener);
    reclaim(&path);
    Ok(())
}

#[test]
fn bounded_wait_connects_to_live_listener() -> TestResult {
    testinit();
    let (path, listener) = bind_fresh(&mut NameGen::new(make_id!()))?;

    let mut conn =
        Connector::new().wait_mode(ConnectWaitMode::Timeout(Duration::from_millis(100)));
    conn.connect_to(&path).context("bounded-wait connect failed")?;
    ensure!(conn.socket().is_attached(), "bounded-wait connect did not attach");
    let _server = listener.accept().context("accept failed")?;

    reclaim(&path);
    Ok(())
}
