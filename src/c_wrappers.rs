//! The only module that calls into `libc` directly. Everything here reports failure through
//! `io::Result` with the captured errno value.

use {
    crate::{addr::LocalAddress, misc::*},
    libc::c_int,
    std::{
        io,
        mem::size_of,
        os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd},
        ptr::addr_of_mut,
        time::{Duration, Instant},
    },
};
#[cfg(not(target_os = "linux"))]
use std::os::fd::AsFd;

/// Creates a client-side Unix-domain stream socket, optionally in non-blocking mode.
///
/// Close-on-exec is always requested. On Linux both flags are applied atomically at creation;
/// elsewhere they are set with follow-up `fcntl` calls.
pub(crate) fn create_client_socket(nonblocking: bool) -> io::Result<OwnedFd> {
    #[allow(unused_mut, clippy::let_and_return)]
    let ty = {
        let mut ty = libc::SOCK_STREAM;
        #[cfg(target_os = "linux")]
        {
            ty |= libc::SOCK_CLOEXEC;
            if nonblocking {
                ty |= libc::SOCK_NONBLOCK;
            }
        }
        ty
    };
    let fd = unsafe { libc::socket(libc::AF_UNIX, ty, 0) }.fd_or_errno()?;
    // SAFETY: we just created this descriptor
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };
    #[cfg(not(target_os = "linux"))]
    {
        set_cloexec(fd.as_fd())?;
        if nonblocking {
            set_nonblocking(fd.as_fd(), true)?;
        }
    }
    Ok(fd)
}

/// Issues `connect(2)` on the given socket with the given local address.
pub(crate) fn connect(fd: BorrowedFd<'_>, addr: &LocalAddress) -> io::Result<()> {
    unsafe { libc::connect(fd.as_raw_fd(), addr.as_ptr(), addr.len()) != -1 }
        .true_val_or_errno(())
}

/// Returns whether the given connect error means the attempt is still resolving in the
/// background rather than having failed.
///
/// `EAGAIN` is deliberately absent: on Unix-domain sockets it means the listener's backlog is
/// full and no connection attempt was registered at all, so treating it as in-progress would
/// hand off a descriptor that can never become connected.
pub(crate) fn connect_in_progress(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(libc::EINPROGRESS) | Some(libc::EINTR))
}

/// Waits for an in-progress connect on `fd` to resolve, for up to the given amount of time
/// (indefinitely if `None`), then reports its outcome.
pub(crate) fn wait_for_connect(fd: BorrowedFd<'_>, timeout: Option<Duration>) -> io::Result<()> {
    let deadline = timeout.map(timeout_expiry).transpose()?;
    loop {
        let remaining = match deadline {
            Some(d) => {
                let r = d.saturating_duration_since(Instant::now());
                if r.is_zero() {
                    return Err(io::ErrorKind::TimedOut.into());
                }
                Some(r)
            }
            None => None,
        };
        match poll_writable(fd, remaining) {
            Ok(true) => break,
            Ok(false) => return Err(io::ErrorKind::TimedOut.into()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    match take_error(fd)? {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Polls `fd` for writability, which for a connecting socket doubles as connect resolution.
/// `None` waits indefinitely, `Some(Duration::ZERO)` is a pure readiness check.
pub(crate) fn poll_writable(fd: BorrowedFd<'_>, timeout: Option<Duration>) -> io::Result<bool> {
    let mut pfd = libc::pollfd { fd: fd.as_raw_fd(), events: libc::POLLOUT, revents: 0 };
    #[allow(clippy::cast_possible_truncation)] // clamped to i32::MAX beforehand
    let timeout = match timeout {
        // Round up so that sub-millisecond timeouts don't spin on a zero-timeout poll.
        Some(t) => t
            .as_millis()
            .saturating_add(u128::from(t.subsec_nanos() % 1_000_000 != 0))
            .min(c_int::MAX as u128) as c_int,
        None => -1,
    };
    let ret = unsafe { libc::poll(addr_of_mut!(pfd), 1, timeout) };
    (ret != -1).true_val_or_errno(ret > 0)
}

/// Retrieves and clears the pending `SO_ERROR` value of the socket.
pub(crate) fn take_error(fd: BorrowedFd<'_>) -> io::Result<Option<io::Error>> {
    let mut err: c_int = 0;
    #[allow(clippy::cast_possible_truncation)]
    let mut len = size_of::<c_int>() as libc::socklen_t;
    unsafe {
        libc::getsockopt(
            fd.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_ERROR,
            addr_of_mut!(err).cast(),
            addr_of_mut!(len),
        ) != -1
    }
    .true_val_or_errno(())?;
    Ok((err != 0).then(|| io::Error::from_raw_os_error(err)))
}

/// Enables or disables `O_NONBLOCK` on the descriptor.
pub(crate) fn set_nonblocking(fd: BorrowedFd<'_>, nonblocking: bool) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFL, 0) }.fd_or_errno()?;
    let new_flags = if nonblocking {
        flags | libc::O_NONBLOCK
    } else {
        flags & !libc::O_NONBLOCK
    };
    if new_flags != flags {
        unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFL, new_flags) != -1 }
            .true_val_or_errno(())?;
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn set_cloexec(fd: BorrowedFd<'_>) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFD, 0) }.fd_or_errno()?;
    unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, flags | libc::FD_CLOEXEC) != -1 }
        .true_val_or_errno(())
}

fn timeout_expiry(timeout: Duration) -> io::Result<Instant> {
    let msg = "timeout expiry time overflowed std::time::Instant";
    Instant::now()
        .checked_add(timeout)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, msg))
}
