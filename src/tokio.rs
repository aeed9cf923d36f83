use {
    crate::{
        addr::{LocalAddress, SUN_PATH_LEN},
        c_wrappers,
        error::ConnectError,
    },
    std::{os::fd::AsFd, os::unix::net::UnixStream as SyncUnixStream, path::Path},
    tokio::net::UnixStream,
};

/// Connects to the local socket at the given filesystem path, waiting for the peer to accept on
/// the Tokio reactor.
///
/// Path validation and error classification are identical to the synchronous
/// [`Connector`](crate::connector::Connector); the deferred-completion wait is the only part that
/// differs, being driven by reactor readiness notifications instead of `poll(2)`.
pub async fn connect(path: impl AsRef<Path>) -> Result<UnixStream, ConnectError> {
    connect_with_capacity(path, SUN_PATH_LEN).await
}

/// Like [`connect`], but validates the path against an injected capacity limit, as per
/// [`LocalAddress::from_path_with_capacity`].
pub async fn connect_with_capacity(
    path: impl AsRef<Path>,
    capacity: usize,
) -> Result<UnixStream, ConnectError> {
    let addr = LocalAddress::from_path_with_capacity(path, capacity)?;
    let fd = c_wrappers::create_client_socket(true).map_err(ConnectError::CreateFailed)?;

    let pending = match c_wrappers::connect(fd.as_fd(), &addr) {
        Ok(()) => false,
        Err(e) if c_wrappers::connect_in_progress(&e) => true,
        Err(e) => return Err(ConnectError::classify(e)),
    };

    let stream =
        UnixStream::from_std(SyncUnixStream::from(fd)).map_err(ConnectError::Other)?;
    if pending {
        stream.writable().await.map_err(ConnectError::Other)?;
        if let Some(e) = stream.take_error().map_err(ConnectError::Other)? {
            return Err(ConnectError::classify(e));
        }
    }
    Ok(stream)
}
