use crate::connection::Connection;
use crate::error::{ServerError, ServerResult};
use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Owns the listening socket and hands out accepted connections.
pub struct ConnectionAcceptor {
    listener: TcpListener,
    connection_count: AtomicUsize,
}

impl ConnectionAcceptor {
    /// Bind a blocking listener to the specified address
    pub fn bind<A: ToSocketAddrs>(addr: A, backlog: i32) -> ServerResult<Self> {
        let socket_addr = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "No socket addresses found")
        })?;

        let socket = Self::create_socket(&socket_addr, backlog)?;

        Ok(Self {
            listener: socket.into(),
            connection_count: AtomicUsize::new(0),
        })
    }

    /// Block until the next connection arrives
    pub fn accept(&self) -> ServerResult<Connection> {
        let (stream, addr) = self.listener.accept().map_err(ServerError::AcceptFailure)?;
        let id = self.connection_count.fetch_add(1, Ordering::Relaxed);
        Connection::new(stream, addr, id).map_err(ServerError::AcceptFailure)
    }

    /// Get the local address this acceptor is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Number of connections accepted so far
    pub fn accepted(&self) -> usize {
        self.connection_count.load(Ordering::Relaxed)
    }

    /// Shut the listening socket down so a blocked `accept` returns
    pub fn shutdown(&self) -> io::Result<()> {
        SockRef::from(&self.listener).shutdown(Shutdown::Both)
    }

    /// Create a properly configured socket
    fn create_socket(addr: &SocketAddr, backlog: i32) -> io::Result<Socket> {
        let domain = if addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&(*addr).into())?;
        socket.listen(backlog)?;

        Ok(socket)
    }
}
