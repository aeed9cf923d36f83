//! The stream-socket seam that adopted descriptors are handed off to.

use {
    crate::c_wrappers,
    std::{
        fmt::{self, Debug, Formatter},
        io::{self, prelude::*, IoSlice, IoSliceMut},
        os::{
            fd::{AsFd, OwnedFd},
            unix::net::UnixStream,
        },
        sync::mpsc::Sender,
        time::Duration,
    },
};

/// Connection progress of a descriptor at handoff time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConnectPhase {
    /// The peer has already accepted the connection; the descriptor is ready for I/O.
    Connected,
    /// The connect call returned with the attempt still resolving in the background. The
    /// adopting stream observes the eventual outcome through its readiness machinery.
    InProgress,
}

/// Notifications emitted by [`Stream`] on its subscribed event channel.
#[derive(Debug)]
pub enum StreamEvent {
    /// The connection became established.
    Connected,
    /// A deferred connect resolved to a failure. Carries the OS error taken from the socket.
    ConnectFailed(io::Error),
    /// The descriptor was released and closed.
    Closed,
}

/// The descriptor-ownership-transfer contract between the connector and a stream-socket
/// abstraction.
///
/// Exactly one owner is responsible for a descriptor at every point in time: the connector while
/// the attempt is unresolved, the adopting implementor of this trait afterwards. An implementor
/// that receives a descriptor through [`adopt`](Self::adopt) is solely responsible for its entire
/// subsequent lifecycle, including closing it.
pub trait StreamSocket {
    /// Takes exclusive ownership of an already-connected or still-connecting descriptor and
    /// begins driving its I/O. Any previously held descriptor is released first.
    fn adopt(&mut self, fd: OwnedFd, phase: ConnectPhase);
    /// Releases and closes the currently held descriptor, if any. Calling this on an instance
    /// that holds nothing is a no-op, not an error.
    fn release(&mut self);
    /// Returns whether a descriptor is currently held.
    fn is_attached(&self) -> bool;
}

/// A byte stream over an adopted local socket descriptor.
///
/// This is the bundled [`StreamSocket`] implementation: a thin wrapper around
/// [`UnixStream`] that adds the connect-resolution bookkeeping a deferred handoff needs, plus an
/// event channel through which connect completion, connect failure and closure are observable.
///
/// An external reactor (or any caller) drives a still-connecting stream by invoking
/// [`resolve`](Self::resolve) whenever the descriptor reports writability; the terminal event is
/// emitted exactly once per adopted descriptor.
pub struct Stream {
    inner: Option<UnixStream>,
    /// A deferred connect has been adopted and has not resolved yet.
    pending: bool,
    /// The terminal Connected/ConnectFailed event has been emitted for the current descriptor.
    settled: bool,
    events: Option<Sender<StreamEvent>>,
}

/// Creation and event subscription.
impl Stream {
    /// Creates a stream with no descriptor attached.
    pub fn new() -> Self {
        Self { inner: None, pending: false, settled: false, events: None }
    }

    /// Registers the sending half of a channel on which connection lifecycle events will be
    /// delivered, replacing any previous registration. The subscription survives reconnects.
    pub fn subscribe(&mut self, events: Sender<StreamEvent>) { self.events = Some(events) }

    fn emit(&self, event: StreamEvent) {
        // A dropped receiver just means nobody is listening anymore.
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

/// Connect resolution and status.
impl Stream {
    /// Drives an adopted connect attempt towards its terminal event.
    ///
    /// Returns `Ok(true)` once the attempt has settled (in this call or a previous one) and
    /// `Ok(false)` while a deferred connect is still unresolved; the check never blocks. The
    /// terminal [`Connected`](StreamEvent::Connected) or
    /// [`ConnectFailed`](StreamEvent::ConnectFailed) event is emitted on the subscribed channel
    /// exactly once per adopted descriptor. A connect failure with no subscriber registered is
    /// returned as the error instead, so that it cannot vanish silently.
    pub fn resolve(&mut self) -> io::Result<bool> {
        let Some(stream) = &self.inner else {
            return Err(not_connected());
        };
        if self.settled {
            return Ok(true);
        }
        if self.pending {
            if !c_wrappers::poll_writable(stream.as_fd(), Some(Duration::ZERO))? {
                return Ok(false);
            }
            if let Some(e) = c_wrappers::take_error(stream.as_fd())? {
                self.pending = false;
                self.settled = true;
                return match &self.events {
                    Some(tx) => {
                        let _ = tx.send(StreamEvent::ConnectFailed(e));
                        Ok(true)
                    }
                    None => Err(e),
                };
            }
            self.pending = false;
        }
        self.settled = true;
        self.emit(StreamEvent::Connected);
        Ok(true)
    }

    /// Retrieves and clears the stored socket error, the post-handoff status accessor.
    pub fn take_error(&self) -> io::Result<Option<io::Error>> {
        match &self.inner {
            Some(stream) => c_wrappers::take_error(stream.as_fd()),
            None => Ok(None),
        }
    }

    /// Enables or disables the nonblocking mode for the stream's reads and writes.
    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        c_wrappers::set_nonblocking(self.stream()?.as_fd(), nonblocking)
    }

    /// Borrows the [`UnixStream`] contained within, granting access to operations defined on it.
    #[inline]
    pub fn inner(&self) -> Option<&UnixStream> { self.inner.as_ref() }

    fn stream(&self) -> io::Result<&UnixStream> {
        self.inner.as_ref().ok_or_else(not_connected)
    }
}

#[cold]
#[inline(never)]
fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "no descriptor has been adopted by this stream")
}

impl StreamSocket for Stream {
    fn adopt(&mut self, fd: OwnedFd, phase: ConnectPhase) {
        self.release();
        self.inner = Some(UnixStream::from(fd));
        self.pending = phase == ConnectPhase::InProgress;
        self.settled = false;
    }
    fn release(&mut self) {
        if self.inner.take().is_some() {
            self.pending = false;
            self.settled = false;
            self.emit(StreamEvent::Closed);
        }
    }
    #[inline]
    fn is_attached(&self) -> bool { self.inner.is_some() }
}

impl Read for &Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&mut &*self.stream()?).read(buf)
    }
    fn read_vectored(&mut self, bufs: &mut [IoSliceMut<'_>]) -> io::Result<usize> {
        (&mut &*self.stream()?).read_vectored(bufs)
    }
}
impl Write for &Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&mut &*self.stream()?).write(buf)
    }
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        (&mut &*self.stream()?).write_vectored(bufs)
    }
    #[inline]
    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}
impl Read for Stream {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> { (&mut &*self).read(buf) }
    #[inline]
    fn read_vectored(&mut self, bufs: &mut [IoSliceMut<'_>]) -> io::Result<usize> {
        (&mut &*self).read_vectored(bufs)
    }
}
impl Write for Stream {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { (&mut &*self).write(buf) }
    #[inline]
    fn write_vectored(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize> {
        (&mut &*self).write_vectored(bufs)
    }
    #[inline]
    fn flush(&mut self) -> io::Result<()> { (&mut &*self).flush() }
}

impl Default for Stream {
    #[inline]
    fn default() -> Self { Self::new() }
}

impl Debug for Stream {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("inner", &self.inner)
            .field("pending", &self.pending)
            .field("settled", &self.settled)
            .field("subscribed", &self.events.is_some())
            .finish()
    }
}
