//! The connection-attempt lifecycle: socket creation, the connect call, error classification and
//! descriptor handoff.

use {
    crate::{
        addr::{LocalAddress, SUN_PATH_LEN},
        c_wrappers,
        error::ConnectError,
        stream::{ConnectPhase, Stream, StreamSocket},
        ConnectWaitMode,
    },
    std::{
        fmt::{self, Debug, Formatter},
        os::fd::AsFd,
        path::Path,
    },
};

/// What a successful [`connect_to`](Connector::connect_to) call amounted to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The peer accepted the connection before the call returned.
    Connected,
    /// The attempt was initiated and handed off still-connecting; its resolution will be
    /// observed through the adopted stream's readiness machinery. Only produced under
    /// [`ConnectWaitMode::Deferred`].
    Pending,
}

/// Client-side connector that establishes local socket connections and hands the resulting
/// descriptor off to a wrapped [`StreamSocket`].
///
/// A connector instance owns at most one native socket at any time, and only for the duration of
/// a single [`connect_to`](Self::connect_to) call: on success the descriptor moves into the
/// wrapped socket abstraction, on failure it is closed before the call returns. Instances are
/// reusable – a failed attempt leaves the connector ready for another one, and a new attempt on
/// an already-connected instance tears the previous connection down first.
///
/// The connector assumes single-threaded access, in keeping with the cooperative model of the
/// reactor that drives the adopted stream. Distinct instances share no state.
pub struct Connector<S: StreamSocket = Stream> {
    socket: S,
    wait_mode: ConnectWaitMode,
    capacity: usize,
}

/// Creation and ownership.
impl Connector<Stream> {
    /// Creates a connector wrapping a fresh, unattached [`Stream`].
    pub fn new() -> Self { Self::with_socket(Stream::new()) }
}
impl<S: StreamSocket> Connector<S> {
    /// Creates a connector that will hand descriptors off to the given socket abstraction.
    pub fn with_socket(socket: S) -> Self {
        Self { socket, wait_mode: ConnectWaitMode::default(), capacity: SUN_PATH_LEN }
    }

    /// Borrows the wrapped socket abstraction.
    #[inline]
    pub fn socket(&self) -> &S { &self.socket }
    /// Mutably borrows the wrapped socket abstraction.
    #[inline]
    pub fn socket_mut(&mut self) -> &mut S { &mut self.socket }
    /// Consumes the connector, returning the wrapped socket abstraction.
    #[inline]
    pub fn into_socket(self) -> S { self.socket }
}

/// Option setters.
impl<S: StreamSocket> Connector<S> {
    /// Sets the [wait mode](ConnectWaitMode) of subsequent connection operations.
    ///
    /// This defaults to [unbounded waiting](ConnectWaitMode::Unbounded).
    #[must_use = "this is not an in-place operation"]
    #[inline]
    pub fn wait_mode(mut self, wait_mode: ConnectWaitMode) -> Self {
        self.wait_mode = wait_mode;
        self
    }
    /// Injects a local address capacity limit smaller than the platform's `sun_path` size.
    ///
    /// Paths that do not fit the given capacity (terminator included) fail with
    /// [`AddressTooLong`](ConnectError::AddressTooLong) before any native resource is created.
    #[must_use = "this is not an in-place operation"]
    #[inline]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

/// The connection operation.
impl<S: StreamSocket> Connector<S> {
    /// Connects to the local socket at the given filesystem path.
    ///
    /// If the wrapped socket abstraction already holds a descriptor from a previous attempt, it
    /// is released first. The attempt then proceeds through address construction, socket
    /// creation and the connect call itself; under [`ConnectWaitMode::Deferred`] a connect that
    /// does not complete synchronously is not a failure – the descriptor is handed off in a
    /// still-connecting state and [`ConnectOutcome::Pending`] is returned.
    ///
    /// On any failure the connector holds no native resource by the time the error is returned,
    /// and the previous connection (if any) has already been torn down. The two observable
    /// outcomes are thus: descriptor handed off, or nothing held at all.
    pub fn connect_to(&mut self, path: impl AsRef<Path>) -> Result<ConnectOutcome, ConnectError> {
        self.socket.release();

        let addr = LocalAddress::from_path_with_capacity(path, self.capacity)?;
        let nonblocking_connect =
            matches!(self.wait_mode, ConnectWaitMode::Deferred | ConnectWaitMode::Timeout(..));
        // From here on the descriptor is owned by `fd`; every early return below closes it.
        let fd = c_wrappers::create_client_socket(nonblocking_connect)
            .map_err(ConnectError::CreateFailed)?;

        let phase = match c_wrappers::connect(fd.as_fd(), &addr) {
            Ok(()) => ConnectPhase::Connected,
            Err(e) if c_wrappers::connect_in_progress(&e) => match self.wait_mode {
                ConnectWaitMode::Deferred => ConnectPhase::InProgress,
                ConnectWaitMode::Timeout(timeout) => {
                    c_wrappers::wait_for_connect(fd.as_fd(), Some(timeout))
                        .map_err(ConnectError::classify)?;
                    ConnectPhase::Connected
                }
                // A blocking connect only lands here when interrupted by a signal, in which
                // case the attempt keeps resolving in the background.
                ConnectWaitMode::Unbounded => {
                    c_wrappers::wait_for_connect(fd.as_fd(), None)
                        .map_err(ConnectError::classify)?;
                    ConnectPhase::Connected
                }
            },
            Err(e) => return Err(ConnectError::classify(e)),
        };

        // The bounded wait borrowed non-blocking mode for the connect only; hand the descriptor
        // off with the same blocking I/O semantics Unbounded produces. Deferred keeps it
        // non-blocking for the reactor.
        if matches!(self.wait_mode, ConnectWaitMode::Timeout(..)) {
            c_wrappers::set_nonblocking(fd.as_fd(), false).map_err(ConnectError::Other)?;
        }

        self.socket.adopt(fd, phase);
        Ok(match phase {
            ConnectPhase::Connected => ConnectOutcome::Connected,
            ConnectPhase::InProgress => ConnectOutcome::Pending,
        })
    }
}

impl Default for Connector<Stream> {
    #[inline]
    fn default() -> Self { Self::new() }
}

impl<S: StreamSocket + Debug> Debug for Connector<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("socket", &self.socket)
            .field("wait_mode", &self.wait_mode)
            .field("capacity", &self.capacity)
            .finish()
    }
}
