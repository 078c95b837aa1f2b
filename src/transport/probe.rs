//! Local and peer address lookup on an open socket.
//!
//! Failure is not an error value here: [`probe`] returns `0` and the caller
//! treats that as "no address available".

use socket2::SockAddr;
use std::io;
use std::mem;
use std::net::SocketAddr;
use std::os::unix::io::RawFd;
use tracing::trace;

/// Which end of a connection to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketEnd {
    Local,
    Remote,
}

/// Zeroed storage large enough for any socket address family
#[derive(Clone, Copy)]
pub struct SockAddrStorage {
    storage: libc::sockaddr_storage,
}

impl SockAddrStorage {
    pub fn new() -> Self {
        Self {
            // SAFETY: sockaddr_storage is plain old data; all-zero is a valid value.
            storage: unsafe { mem::zeroed() },
        }
    }

    /// Address family written by the last successful probe
    pub fn family(&self) -> libc::sa_family_t {
        self.storage.ss_family
    }

    /// Interpret the first `len` bytes as an IPv4 or IPv6 address
    pub fn to_socket_addr(&self, len: usize) -> Option<SocketAddr> {
        if len == 0 || len > mem::size_of::<libc::sockaddr_storage>() {
            return None;
        }
        let len = libc::socklen_t::try_from(len).ok()?;
        // SAFETY: `len` is within the storage and the bytes were written by the kernel
        // (or are zero, which every family treats as an unspecified address).
        let addr = unsafe { SockAddr::new(self.storage, len) };
        addr.as_socket()
    }
}

impl Default for SockAddrStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SockAddrStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SockAddrStorage")
            .field("family", &self.family())
            .finish_non_exhaustive()
    }
}

/// Fill `storage` with the `end` address of `fd`.
///
/// Returns the number of bytes written, or `0` when the descriptor is invalid,
/// closed or not connected.
pub fn probe(fd: RawFd, end: SocketEnd, storage: &mut SockAddrStorage) -> usize {
    let mut len = mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
    let ptr = &mut storage.storage as *mut libc::sockaddr_storage as *mut libc::sockaddr;

    // SAFETY: `ptr` points to a live sockaddr_storage and `len` holds its size, so the
    // kernel never writes past the buffer. An invalid `fd` only yields an error.
    let rc = unsafe {
        match end {
            SocketEnd::Local => libc::getsockname(fd, ptr, &mut len),
            SocketEnd::Remote => libc::getpeername(fd, ptr, &mut len),
        }
    };

    if rc != 0 {
        trace!(fd, ?end, error = %io::Error::last_os_error(), "Socket address probe failed");
        return 0;
    }
    len as usize
}

/// Canonical `ip:port` text of the `end` address of `fd`, if it has an IP one.
pub fn probe_name(fd: RawFd, end: SocketEnd) -> Option<String> {
    let mut storage = SockAddrStorage::new();
    let len = probe(fd, end, &mut storage);
    storage.to_socket_addr(len).map(|addr| addr.to_string())
}
