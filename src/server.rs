use crate::acceptor::ConnectionAcceptor;
use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::context::RouterContext;
use crate::dispatcher::{not_found_handler, Dispatcher};
use crate::error::{ServerError, ServerResult};
use crate::logging::{ConsoleSink, LogSink, SharedLogSink};
use crate::router::{HandlerFn, Route, Router};
use parking_lot::Mutex;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle of an [`HttpServer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Listening,
}

struct Running {
    acceptor: Arc<ConnectionAcceptor>,
    shutdown: Arc<AtomicBool>,
    accept_thread: JoinHandle<()>,
}

/// A thread-per-connection HTTP/1.1 server.
///
/// Routes, the default handler and the log sink are configured through
/// `&mut self` before [`start`](HttpServer::start). Starting snapshots them
/// into a shared [`Dispatcher`]; changes made while listening only apply
/// after the next stop/start cycle.
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
    default_handler: HandlerFn,
    log: SharedLogSink,
    running: Mutex<Option<Running>>,
}

impl fmt::Debug for HttpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpServer")
            .field("config", &self.config)
            .field("router", &self.router)
            .field("state", &self.state())
            .finish()
    }
}

impl Default for HttpServer {
    fn default() -> Self {
        Self::with_config(ServerConfig::default())
    }
}

impl HttpServer {
    /// An idle server that will listen on all interfaces at `port`
    pub fn new(port: u16) -> Self {
        Self::with_config(ServerConfig::default().with_port(port))
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            router: Router::new(),
            default_handler: not_found_handler(),
            log: Arc::new(ConsoleSink),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Register a handler for a path pattern
    pub fn route<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RouterContext) -> ServerResult<()> + Send + Sync + 'static,
    {
        self.router.add_route(pattern, handler);
        self
    }

    pub fn add_route(&mut self, route: Route) -> &mut Self {
        self.router.add(route);
        self
    }

    /// Handler invoked when no route matches, a 404 page unless replaced
    pub fn set_default_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut RouterContext) -> ServerResult<()> + Send + Sync + 'static,
    {
        self.default_handler = Arc::new(handler);
        self
    }

    pub fn set_default_handler_fn(&mut self, handler: HandlerFn) -> &mut Self {
        self.default_handler = handler;
        self
    }

    pub fn set_log_sink<S: LogSink + 'static>(&mut self, sink: S) -> &mut Self {
        self.log = Arc::new(sink);
        self
    }

    pub fn set_shared_log_sink(&mut self, sink: SharedLogSink) -> &mut Self {
        self.log = sink;
        self
    }

    pub fn state(&self) -> ServerState {
        if self.running.lock().is_some() {
            ServerState::Listening
        } else {
            ServerState::Stopped
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ServerState::Stopped
    }

    /// Address the listener is bound to, `None` while stopped
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running
            .lock()
            .as_ref()
            .and_then(|running| running.acceptor.local_addr().ok())
    }

    /// Bind the listener and spawn the accept loop.
    ///
    /// Fails with [`ServerError::AlreadyStarted`] while already listening. On a
    /// bind failure the server stays stopped.
    pub fn start(&self) -> ServerResult<()> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(ServerError::AlreadyStarted);
        }
        self.config.validate()?;

        let acceptor = Arc::new(ConnectionAcceptor::bind(
            self.config.socket_address(),
            self.config.backlog_size,
        )?);
        let local_addr = acceptor.local_addr()?;

        let dispatcher = Arc::new(Dispatcher::new(
            self.router.clone(),
            self.default_handler.clone(),
            self.log.clone(),
            self.config.read_buffer_size,
        ));
        let shutdown = Arc::new(AtomicBool::new(false));

        let accept_thread = {
            let acceptor = acceptor.clone();
            let shutdown = shutdown.clone();
            thread::Builder::new()
                .name("http-accept".to_string())
                .spawn(move || accept_loop(|| acceptor.accept(), dispatcher, &shutdown))?
        };

        self.log.info(&format!("HttpServer start on port: {}", local_addr.port()));
        *running = Some(Running {
            acceptor,
            shutdown,
            accept_thread,
        });
        Ok(())
    }

    /// Close the listener and wait for the accept loop to exit.
    ///
    /// Connections already handed to their threads run to completion. Stopping
    /// a stopped server does nothing.
    pub fn stop(&self) -> ServerResult<()> {
        let Some(running) = self.running.lock().take() else {
            return Ok(());
        };

        running.shutdown.store(true, Ordering::SeqCst);
        let local_addr = running.acceptor.local_addr();
        if let Err(e) = running.acceptor.shutdown() {
            log::debug!("listener shutdown: {}", e);
        }
        // Not every platform wakes a blocked accept on shutdown; a throwaway
        // connection always does.
        if let Ok(addr) = local_addr {
            let _ = TcpStream::connect_timeout(&wake_address(addr), Duration::from_millis(200));
        }

        if running.accept_thread.join().is_err() {
            self.log.error("accept loop panicked");
        }
        self.log.info("HttpServer stopped");
        Ok(())
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// First pause after a failed accept; doubles per consecutive failure
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(10);
const ACCEPT_RETRY_MAX: Duration = Duration::from_secs(1);

/// Pause schedule for consecutive accept failures, such as running out of
/// file descriptors. Reset by the next successful accept.
#[derive(Debug)]
struct AcceptBackoff {
    next: Duration,
}

impl AcceptBackoff {
    fn new() -> Self {
        Self {
            next: ACCEPT_RETRY_DELAY,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(ACCEPT_RETRY_MAX);
        delay
    }

    fn reset(&mut self) {
        self.next = ACCEPT_RETRY_DELAY;
    }
}

fn accept_loop<A>(mut accept: A, dispatcher: Arc<Dispatcher>, shutdown: &AtomicBool)
where
    A: FnMut() -> ServerResult<Connection>,
{
    let mut backoff = AcceptBackoff::new();
    loop {
        let accepted = accept();
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        match accepted {
            Ok(connection) => {
                backoff.reset();
                let id = connection.id();
                let worker = dispatcher.clone();
                let spawned = thread::Builder::new()
                    .name(format!("http-conn-{}", id))
                    .spawn(move || worker.serve(connection));
                if let Err(e) = spawned {
                    dispatcher
                        .log()
                        .error(&format!("failed to spawn thread for connection {}: {}", id, e));
                }
            }
            Err(e) => {
                dispatcher.log().error(&e.to_string());
                thread::sleep(backoff.next_delay());
            }
        }
    }
    log::debug!("accept loop exited");
}

/// Loopback stand-in for a wildcard bind address
fn wake_address(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port())
        }
        IpAddr::V6(ip) if ip.is_unspecified() => {
            SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port())
        }
        _ => addr,
    }
}
