//! What happens when a client attempts to connect to a local socket nobody is listening on.

use {
    crate::util::*,
    color_eyre::eyre::{bail, ensure},
    pathsock::{ConnectError, Connector, StreamSocket},
};

#[test]
fn refused_and_nothing_leaked() -> TestResult {
    testinit();
    let path = unbound_path(&mut NameGen::new(make_id!()));
    let mut conn = Connector::new();

    let _count_guard = fd_count_lock();
    let before = fd_count();
    match conn.connect_to(&path) {
        Err(ConnectError::Refused(..)) => {}
        Err(e) => bail!("expected connection refusal, got '{e}'"),
        Ok(o) => bail!("successfully connected to nonexistent server: {o:?}"),
    }
    ensure!(!conn.socket().is_attached(), "failed connect left a descriptor attached");
    ensure_fd_count(before, "descriptor leaked on failed connect")?;

    // The instance stays reusable after a failed attempt.
    match conn.connect_to(&path) {
        Err(ConnectError::Refused(..)) => {}
        Err(e) => bail!("expected connection refusal on retry, got '{e}'"),
        Ok(o) => bail!("successfully connected to nonexistent server on retry: {o:?}"),
    }
    Ok(())
}

#[test]
fn dead_socket_file_is_refused() -> TestResult {
    testinit();
    let (path, listener) = bind_fresh(&mut NameGen::new(make_id!()))?;
    // The listener is gone but its socket file lingers in the filesystem.
    drop(listener);

    let mut conn = Connector::new();
    match conn.connect_to(&path) {
        Err(ConnectError::Refused(..)) => {}
        Err(e) => bail!("expected connection refusal, got '{e}'"),
        Ok(o) => bail!("successfully connected to dead socket file: {o:?}"),
    }
    ensure!(!conn.socket().is_attached(), "failed connect left a descriptor attached");
    reclaim(&path);
    Ok(())
}
