use crate::http::Request;
use crate::response::Response;
use crate::router::{PathParams, Route};
use std::net::{SocketAddr, TcpStream};

/// Everything a handler gets for one request.
///
/// Owned by a single connection thread and dropped when it finishes.
#[derive(Debug)]
pub struct RouterContext {
    pub request: Request,
    pub response: Response,
    /// The matched route, `None` when the default handler runs
    pub route: Option<Route>,
    /// Bindings of the matched route's `:name` segments
    pub params: PathParams,
    /// Raw handle of the accepted connection, absent for in-memory dispatch
    pub socket: Option<TcpStream>,
    pub peer_addr: Option<SocketAddr>,
}

impl RouterContext {
    pub fn new(request: Request, response: Response) -> Self {
        Self {
            request,
            response,
            route: None,
            params: PathParams::new(),
            socket: None,
            peer_addr: None,
        }
    }

    pub fn with_socket(mut self, socket: TcpStream, peer_addr: SocketAddr) -> Self {
        self.socket = Some(socket);
        self.peer_addr = Some(peer_addr);
        self
    }

    /// Value bound to `:name` by the matched route
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}
