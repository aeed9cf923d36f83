//! Conversion of filesystem paths into protocol-correct local socket addresses.

use {
    crate::error::ConnectError,
    libc::{sockaddr, sockaddr_un, socklen_t},
    std::{
        fmt::{self, Debug, Formatter},
        mem::{size_of, MaybeUninit},
        os::unix::ffi::OsStrExt,
        path::Path,
        ptr::addr_of,
    },
};

/// Size of the `sun_path` field of `sockaddr_un` on the target platform.
///
/// This is the hard ceiling on local socket address capacity – a caller-supplied capacity is
/// honored when smaller, but can never raise the limit past what the platform address layout
/// holds.
pub const SUN_PATH_LEN: usize = {
    // SAFETY: all-zeroes is a valid (if meaningless) bit pattern for sockaddr_un
    let sun = unsafe { MaybeUninit::<sockaddr_un>::zeroed().assume_init() };
    sun.sun_path.len()
};

// Relies on sun_path being the trailing field of sockaddr_un, which holds on every supported
// target and is how the C macro SUN_LEN computes address lengths as well.
const PATH_OFFSET: usize = size_of::<sockaddr_un>() - SUN_PATH_LEN;

/// A fixed-layout local socket address: the `AF_UNIX` family discriminator plus a
/// nul-terminated filesystem path.
///
/// Values of this type have no lifecycle of their own – one is built from a path, passed to a
/// single connect operation and discarded. Construction is a pure transformation: it performs no
/// syscalls and touches no global state.
#[derive(Copy, Clone)]
pub struct LocalAddress {
    addr: sockaddr_un,
    len: socklen_t,
}

/// Construction.
impl LocalAddress {
    /// Builds an address from the given path, with the full platform capacity in force.
    ///
    /// Fails with [`InvalidPath`](ConnectError::InvalidPath) if the path is empty or contains a
    /// nul byte, and with [`AddressTooLong`](ConnectError::AddressTooLong) if the path together
    /// with its nul terminator does not fit in `sun_path`. Oversized paths are never silently
    /// truncated.
    #[inline]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConnectError> {
        Self::from_path_with_capacity(path, SUN_PATH_LEN)
    }

    /// Builds an address from the given path against an injected capacity limit.
    ///
    /// The effective capacity is the smaller of `capacity` and [`SUN_PATH_LEN`]. Validation is
    /// otherwise identical to [`from_path`](Self::from_path).
    #[allow(clippy::arithmetic_side_effects)] // len < capacity <= SUN_PATH_LEN
    pub fn from_path_with_capacity(
        path: impl AsRef<Path>,
        capacity: usize,
    ) -> Result<Self, ConnectError> {
        let bytes = path.as_ref().as_os_str().as_bytes();
        if bytes.is_empty() || bytes.contains(&0) {
            return Err(ConnectError::InvalidPath);
        }
        let capacity = capacity.min(SUN_PATH_LEN);
        // The nul terminator has to fit too.
        if bytes.len() >= capacity {
            return Err(ConnectError::AddressTooLong);
        }

        // SAFETY: as above, all-zeroes is valid for sockaddr_un; this also pre-writes the
        // terminator and zero-fills the tail padding some platforms expect
        let mut addr = unsafe { MaybeUninit::<sockaddr_un>::zeroed().assume_init() };
        addr.sun_family = libc::AF_UNIX as libc::sa_family_t;
        #[allow(clippy::cast_possible_wrap)] // c_char is i8 on most platforms, bitwise copy
        for (dst, src) in addr.sun_path.iter_mut().zip(bytes) {
            *dst = *src as libc::c_char;
        }

        #[allow(clippy::cast_possible_truncation)] // bounded by SUN_PATH_LEN
        let len = (PATH_OFFSET + bytes.len() + 1) as socklen_t;
        Ok(Self { addr, len })
    }
}

/// Accessors used by the connect machinery.
impl LocalAddress {
    /// Returns a pointer to the address structure, suitable for passing to `connect(2)`.
    #[inline]
    pub fn as_ptr(&self) -> *const sockaddr { addr_of!(self.addr).cast() }

    /// Returns the address length that accompanies [`as_ptr`](Self::as_ptr) in the connect call.
    #[inline]
    pub fn len(&self) -> socklen_t { self.len }

    /// Always false – an address without a path is not constructible.
    #[inline]
    pub fn is_empty(&self) -> bool { false }

    /// Borrows the path bytes stored in the address, without the nul terminator.
    pub fn path_bytes(&self) -> &[u8] {
        let plen = (self.len as usize).saturating_sub(PATH_OFFSET).saturating_sub(1);
        // SAFETY: sun_path is initialized up to plen, and c_char and u8 share layout
        unsafe {
            std::slice::from_raw_parts(self.addr.sun_path.as_ptr().cast::<u8>(), plen)
        }
    }
}

impl Debug for LocalAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalAddress")
            .field("path", &String::from_utf8_lossy(self.path_bytes()))
            .field("len", &self.len)
            .finish()
    }
}
