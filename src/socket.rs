//! Single-attempt non-blocking TCP socket.

use std::io;
use std::net::{Shutdown, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::trace;

static OPEN_SOCKETS: AtomicUsize = AtomicUsize::new(0);

/// Number of ephemeral sockets currently holding an OS handle.
pub fn open_sockets() -> usize {
    OPEN_SOCKETS.load(Ordering::SeqCst)
}

/// Owns exactly one OS socket for the duration of one probe attempt.
///
/// The handle is shut down and closed on [`EphemeralSocket::close`] or on
/// drop, whichever comes first.
#[derive(Debug)]
pub struct EphemeralSocket {
    inner: Option<Socket>,
}

impl EphemeralSocket {
    /// Create a socket and switch it to non-blocking mode.
    pub fn new(domain: Domain, ty: Type, protocol: Option<Protocol>) -> io::Result<Self> {
        let socket = Socket::new(domain, ty, protocol)?;
        socket.set_nonblocking(true)?;
        OPEN_SOCKETS.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            inner: Some(socket),
        })
    }

    /// TCP socket matching the family of `addr`.
    pub fn tcp_for(addr: &SocketAddr) -> io::Result<Self> {
        Self::new(Domain::for_address(*addr), Type::STREAM, Some(Protocol::TCP))
    }

    /// Start a non-blocking connect. An in-progress connect is `Ok`.
    pub fn start_connect(&self, addr: &SocketAddr) -> io::Result<()> {
        match self.socket()?.connect(&SockAddr::from(*addr)) {
            Ok(()) => Ok(()),
            Err(e) if connect_in_progress(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Non-blocking send used as the connection-completed check.
    pub fn try_send(&self, payload: &[u8]) -> io::Result<usize> {
        self.socket()?.send(payload)
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    /// Best-effort shutdown then close. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(socket) = self.inner.take() {
            if let Err(e) = socket.shutdown(Shutdown::Both) {
                trace!(error = %e, "shutdown on ephemeral socket");
            }
            drop(socket);
            OPEN_SOCKETS.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn socket(&self) -> io::Result<&Socket> {
        self.inner
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "socket already closed"))
    }
}

impl Drop for EphemeralSocket {
    fn drop(&mut self) {
        self.close();
    }
}

fn connect_in_progress(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    #[cfg(unix)]
    {
        e.raw_os_error() == Some(libc::EINPROGRESS)
    }
    #[cfg(not(unix))]
    {
        false
    }
}
