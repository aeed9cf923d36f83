//! Classification of local socket connection failures.

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io,
};

/// Reason for which a connection attempt failed before descriptor handoff.
///
/// Failures that occur after handoff – a deferred connect resolving to an error – are not
/// represented here; they surface through the adopting stream's event channel and its
/// [`take_error`](crate::stream::Stream::take_error) accessor instead.
#[derive(Debug)]
pub enum ConnectError {
    /// The path was empty or contained a nul byte, which the local addressing scheme cannot
    /// represent.
    InvalidPath,
    /// The path, together with its required nul terminator, exceeds the local address capacity
    /// in force.
    AddressTooLong,
    /// The native socket could not be allocated (descriptor limits, memory pressure, policy).
    CreateFailed(io::Error),
    /// No peer is listening at the path, or the peer refused the connection.
    Refused(io::Error),
    /// Filesystem or socket permissions prevent connecting to the path.
    PermissionDenied(io::Error),
    /// The connection did not become established within the configured wait time.
    TimedOut,
    /// Any other operating system error reported during the attempt.
    Other(io::Error),
}

impl ConnectError {
    /// Sorts a raw OS error returned by the connect machinery into the taxonomy.
    pub(crate) fn classify(e: io::Error) -> Self {
        use io::ErrorKind::*;
        match e.kind() {
            // A nonexistent socket file and a dead socket file are the same condition as far as
            // callers are concerned: nothing is accepting at that path.
            NotFound | ConnectionRefused => Self::Refused(e),
            PermissionDenied => Self::PermissionDenied(e),
            TimedOut => Self::TimedOut,
            // `WouldBlock` lands in the catch-all on purpose: a connect that returns `EAGAIN`
            // was never registered by the kernel (full listener backlog) and is retryable, which
            // `Other` preserves by keeping the raw error.
            _ => Self::Other(e),
        }
    }

    const fn msg(&self) -> &'static str {
        use ConnectError::*;
        match self {
            InvalidPath => "path is empty or contains a nul byte",
            AddressTooLong => "path length exceeds local socket address capacity",
            CreateFailed(..) => "could not create socket",
            Refused(..) => "connection refused",
            PermissionDenied(..) => "permission denied",
            TimedOut => "connection attempt timed out",
            Other(..) => "connection attempt failed",
        }
    }

    /// Borrows the underlying OS error, if this variant carries one.
    pub fn os_error(&self) -> Option<&io::Error> {
        use ConnectError::*;
        match self {
            CreateFailed(e) | Refused(e) | PermissionDenied(e) | Other(e) => Some(e),
            InvalidPath | AddressTooLong | TimedOut => None,
        }
    }
}

impl Display for ConnectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.os_error() {
            Some(e) => write!(f, "{}: {}", self.msg(), e),
            None => f.write_str(self.msg()),
        }
    }
}
impl Error for ConnectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.os_error().map(|e| e as &(dyn Error + 'static))
    }
}

impl From<ConnectError> for io::Error {
    fn from(e: ConnectError) -> Self {
        use ConnectError::*;
        match e {
            InvalidPath | AddressTooLong => {
                io::Error::new(io::ErrorKind::InvalidInput, e.msg())
            }
            TimedOut => io::Error::new(io::ErrorKind::TimedOut, e.msg()),
            CreateFailed(e) | Refused(e) | PermissionDenied(e) | Other(e) => e,
        }
    }
}
