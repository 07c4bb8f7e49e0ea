use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};

/// Represents an accepted TCP connection with a client
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    id: usize,
}

impl Connection {
    /// Create a new connection from a TcpStream
    pub fn new(stream: TcpStream, peer_addr: SocketAddr, id: usize) -> io::Result<Self> {
        // Set TCP_NODELAY to disable Nagle's algorithm
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            peer_addr,
            id,
        })
    }

    /// Perform one blocking read of up to `buffer_size` bytes.
    ///
    /// There is no retry loop: a request split across several segments is
    /// seen truncated.
    pub fn read_request(&mut self, buffer_size: usize) -> io::Result<Vec<u8>> {
        let mut buffer = vec![0; buffer_size];
        let bytes_read = self.stream.read(&mut buffer)?;
        buffer.truncate(bytes_read);
        Ok(buffer)
    }

    /// A second handle on the socket for the response to write to
    pub fn transport(&self) -> io::Result<TcpStream> {
        self.stream.try_clone()
    }

    /// A second handle on the socket for handlers
    pub fn raw_socket(&self) -> io::Result<TcpStream> {
        self.stream.try_clone()
    }

    /// Get the connection's peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the connection's unique ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get a reference to the underlying TcpStream
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }
}
