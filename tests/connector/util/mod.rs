//! Test utilities for allocating fresh socket paths and binding throwaway listeners.
#![allow(dead_code, unused_macros)]


pub use {eyre::*, namegen::*, xorshift::*};

use {
    color_eyre::eyre::WrapErr,
    std::{
        os::unix::net::UnixListener,
        sync::{Mutex, MutexGuard},
        thread,
        time::Duration,
    },
};

pub fn testinit() { eyre::install() }

/// Binds a listener on a freshly generated path, skipping collisions with leftover sockets.
pub fn bind_fresh(namegen: &mut NameGen) -> TestResult<(String, UnixListener)> {
    use std::io::ErrorKind::*;
    loop {
        let nm = namegen.next().unwrap(); // infinite iterator
        match UnixListener::bind(&nm) {
            Ok(l) => return Ok((nm, l)),
            Err(e) if matches!(e.kind(), AddrInUse | PermissionDenied) => continue,
            Err(e) => return Err(e).context("listener bind failed"),
        }
    }
}

/// Produces a path that nothing is listening on.
pub fn unbound_path(namegen: &mut NameGen) -> String {
    loop {
        let nm = namegen.next().unwrap(); // infinite iterator
        if !std::path::Path::new(&nm).exists() {
            return nm;
        }
    }
}

static FD_COUNT_LOCK: Mutex<()> = Mutex::new(());

/// Serializes tests that compare descriptor counts, so they do not perturb each other's
/// measurements. Hold the guard across the whole baseline-to-check window.
pub fn fd_count_lock() -> MutexGuard<'static, ()> {
    FD_COUNT_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// Number of currently open descriptors, for leak checks. Only measurable on Linux.
pub fn fd_count() -> Option<usize> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_dir("/proc/self/fd").ok().map(|d| d.count())
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Checks that the descriptor count has returned to `before`, retrying for a while first: the
/// count is process-wide, and tests outside the counting lock may hold descriptors transiently. A
/// real leak is stable and fails every retry.
pub fn ensure_fd_count(before: Option<usize>, what: &str) -> TestResult {
    let mut now = fd_count();
    for _ in 0..100 {
        if now == before {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(2));
        now = fd_count();
    }
    ensure_eq!(now, before, "{}", what);
    Ok(())
}

/// Best-effort removal of a socket file a test left behind.
pub fn reclaim(path: &str) { let _ = std::fs::remove_file(path); }
