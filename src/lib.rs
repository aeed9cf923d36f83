#![doc = include_str!("../README.md")]
//!
//! ## Moving parts
//! - [`LocalAddress`](addr::LocalAddress) converts a path into a protocol-correct `sockaddr_un`
//!   value, validating length and encoding constraints up front;
//! - [`Connector`](connector::Connector) owns the connection-attempt lifecycle: socket creation,
//!   the connect call itself, error classification and deterministic cleanup on every failure
//!   path;
//! - [`StreamSocket`](stream::StreamSocket) is the descriptor-ownership-transfer contract through
//!   which a successfully connected (or still-connecting) descriptor is adopted by the stream
//!   abstraction that drives all subsequent I/O. [`Stream`](stream::Stream) is the bundled
//!   implementation, complete with an event channel for observing deferred connect resolution.
//!
//! A connect attempt either fully succeeds, with the descriptor handed off, or fully fails, with
//! no native resource left behind. There is no in-between state observable to the caller.
#![cfg_attr(feature = "doc_cfg", feature(doc_cfg))]
// If this was in Cargo.toml, it would cover examples as well
#![warn(
    missing_docs,
    clippy::panic_in_result_fn,
    clippy::missing_assert_message,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

mod platform_check;

pub mod addr;
pub mod connector;
pub mod error;
pub mod stream;

/// Asynchronous connection establishment on the Tokio runtime and event loop.
///
/// The deferred-completion wait is delegated entirely to the Tokio reactor: the connect call is
/// issued in non-blocking mode and the returned [`UnixStream`](::tokio::net::UnixStream) resolves
/// the attempt through kernel readiness notifications instead of blocking a thread.
#[cfg(feature = "tokio")]
#[cfg_attr(feature = "doc_cfg", doc(cfg(feature = "tokio")))]
pub mod tokio;

mod c_wrappers;
mod misc;

pub use {
    addr::LocalAddress,
    connector::{ConnectOutcome, Connector},
    error::ConnectError,
    stream::{ConnectPhase, Stream, StreamEvent, StreamSocket},
};

/// Describes how a connection operation should wait for the server to accept it.
#[derive(Copy, Clone, Debug, Default)]
pub enum ConnectWaitMode {
    /// The connection operation returns immediately after initiating the attempt. If the peer has
    /// not yet accepted, the descriptor is handed off in a still-connecting state and the eventual
    /// resolution is observed through the adopting stream's readiness machinery.
    Deferred,
    /// A wait state is entered until the connection becomes established which lasts for up to the
    /// given amount of time. An error of kind [`TimedOut`](std::io::ErrorKind::TimedOut) is
    /// returned if it does not become established within that timeframe.
    Timeout(std::time::Duration),
    /// A wait state is entered until the connection becomes established. This wait state may
    /// last for an indefinite amount of time.
    #[default]
    Unbounded,
}
