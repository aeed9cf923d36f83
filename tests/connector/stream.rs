//! End-to-end byte exchange through an adopted stream.

use {
    crate::util::*,
    color_eyre::eyre::{bail, Context},
    pathsock::{ConnectOutcome, Connector},
    std::{
        io::{BufRead, BufReader, Write},
        thread,
    },
};

#[test]
fn echo_roundtrip() -> TestResult {
    testinit();
    let (path, listener) = bind_fresh(&mut NameGen::new(make_id!()))?;

    let server = thread::spawn(move || -> TestResult {
        let (conn, _) = listener.accept().context("accept failed")?;
        let mut buffer = String::new();
        BufReader::new(&conn)
            .read_line(&mut buffer)
            .context("socket receive failed")?;
        ensure_eq!(buffer, "Message from client!\n");
        (&conn)
            .write_all(b"Message from server!\n")
            .context("socket send failed")?;
        Ok(())
    });

    let mut conn = Connector::new();
    match conn.connect_to(&path) {
        Ok(ConnectOutcome::Connected) => {}
        Ok(o) => bail!("expected a synchronously connected stream, got {o:?}"),
        Err(e) => bail!("connect failed: {e}"),
    }

    conn.socket()
        .write_all(b"Message from client!\n")
        .context("socket send failed")?;
    let mut buffer = String::new();
    BufReader::new(conn.socket())
        .read_line(&mut buffer)
        .context("socket receive failed")?;
    ensure_eq!(buffer, "Message from server!\n");

    server.join().expect("server thread panicked")?;
    reclaim(&path);
    Ok(())
}
