use crate::connection::Connection;
use crate::context::RouterContext;
use crate::error::{ServerError, ServerResult};
use crate::http::Request;
use crate::logging::SharedLogSink;
use crate::response::Response;
use crate::router::{HandlerFn, Router};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// The per-connection pipeline: parse, resolve, run a handler.
///
/// Built once when the server starts and shared read-only by every
/// connection thread.
pub struct Dispatcher {
    router: Router,
    default_handler: HandlerFn,
    log: SharedLogSink,
    read_buffer_size: usize,
}

impl Dispatcher {
    pub fn new(
        router: Router,
        default_handler: HandlerFn,
        log: SharedLogSink,
        read_buffer_size: usize,
    ) -> Self {
        Self {
            router,
            default_handler,
            log,
            read_buffer_size,
        }
    }

    pub fn log(&self) -> &SharedLogSink {
        &self.log
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Run one accepted connection end to end.
    ///
    /// Every failure stays inside this call: it is logged and the connection
    /// is dropped.
    pub fn serve(&self, mut connection: Connection) {
        let data = match connection.read_request(self.read_buffer_size) {
            Ok(data) => data,
            Err(e) => {
                self.log.error(&format!(
                    "read from {} failed: {}",
                    connection.peer_addr(),
                    e
                ));
                return;
            }
        };
        log::trace!("connection {} read {} bytes", connection.id(), data.len());

        let request = match Request::parse(&data) {
            Ok(request) => request,
            Err(e) => {
                self.log.error(&format!("{}, using default request", e));
                Request::default()
            }
        };

        let ctx = match Self::bind_context(&connection, request) {
            Ok(ctx) => ctx,
            Err(e) => {
                self.log.error(&format!(
                    "connection {} unusable: {}",
                    connection.id(),
                    e
                ));
                return;
            }
        };

        if let Err(e) = self.dispatch_guarded(ctx) {
            self.log.error(&e.to_string());
        }
        log::trace!("connection {} done", connection.id());
    }

    /// Resolve the request's route and run its handler (or the default one).
    pub fn dispatch(&self, mut ctx: RouterContext) -> ServerResult<()> {
        self.log.info(&format!(
            "{} {}",
            ctx.request.method(),
            ctx.request.target()
        ));

        let handler = match self.router.resolve(ctx.request.target()) {
            Some((route, params)) => {
                self.log.info(&format!("router[{}] matched", route.pattern()));
                ctx.params = params;
                ctx.route = Some(route.clone());
                route.handler().clone()
            }
            None => {
                self.log.info("no route match");
                self.default_handler.clone()
            }
        };

        handler(&mut ctx)
    }

    /// [`dispatch`](Self::dispatch) with handler panics turned into
    /// [`ServerError::HandlerFailure`]
    pub fn dispatch_guarded(&self, ctx: RouterContext) -> ServerResult<()> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(ctx))) {
            Ok(result) => result,
            Err(payload) => Err(ServerError::HandlerFailure(panic_message(payload.as_ref()))),
        }
    }

    fn bind_context(connection: &Connection, request: Request) -> std::io::Result<RouterContext> {
        let response = Response::new(Box::new(connection.transport()?));
        Ok(RouterContext::new(request, response)
            .with_socket(connection.raw_socket()?, connection.peer_addr()))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", msg)
    } else {
        "handler panicked".to_string()
    }
}

/// The stock fallback: `404 Not Found` and close
pub fn not_found_handler() -> HandlerFn {
    std::sync::Arc::new(|ctx: &mut RouterContext| ctx.response.not_found().finalize_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::tests::MemorySink;
    use crate::response::tests::RecordingTransport;
    use std::sync::Arc;

    fn context(raw: &[u8]) -> (RouterContext, RecordingTransport) {
        let transport = RecordingTransport::default();
        let request = Request::parse(raw).unwrap();
        let response = Response::new(Box::new(transport.clone()));
        (RouterContext::new(request, response), transport)
    }

    fn dispatcher(router: Router, sink: Arc<MemorySink>) -> Dispatcher {
        Dispatcher::new(router, not_found_handler(), sink, 1024)
    }

    #[test]
    fn test_matched_route_sees_params() {
        let mut router = Router::new();
        router.add_route("/a/:x/b", |ctx| {
            let body = format!("x={}", ctx.param("x").unwrap_or("?"));
            ctx.response.ok().end_text(&body)
        });
        let sink = Arc::new(MemorySink::default());
        let dispatcher = dispatcher(router, sink.clone());

        assert_eq!(dispatcher.router().len(), 1);

        let (ctx, transport) = context(b"GET /a/123/b?debug HTTP/1.1\r\n\r\n");
        dispatcher.dispatch(ctx).unwrap();

        assert!(transport.text().ends_with("\r\n\r\nx=123"));
        let lines = sink.lines.lock();
        assert_eq!(lines[0], "INFO GET /a/123/b?debug");
        assert_eq!(lines[1], "INFO router[/a/:x/b] matched");
    }

    #[test]
    fn test_miss_uses_default_handler() {
        let sink = Arc::new(MemorySink::default());
        let dispatcher = dispatcher(Router::new(), sink.clone());

        let (ctx, transport) = context(b"GET /missing HTTP/1.1\r\n\r\n");
        dispatcher.dispatch(ctx).unwrap();

        assert!(transport.text().starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(transport.text().contains("404 Not Found</h1>"));
        assert_eq!(sink.lines.lock()[1], "INFO no route match");
    }

    #[test]
    fn test_context_route_is_set() {
        let mut router = Router::new();
        router.add_route("/who", |ctx| {
            let pattern = ctx.route.as_ref().map(|r| r.pattern().to_string()).unwrap_or_default();
            ctx.response.ok().end_text(&pattern)
        });
        let dispatcher = dispatcher(router, Arc::new(MemorySink::default()));

        let (ctx, transport) = context(b"GET /who HTTP/1.1\r\n\r\n");
        dispatcher.dispatch(ctx).unwrap();
        assert!(transport.text().ends_with("/who"));
    }

    #[test]
    fn test_handler_error_is_returned() {
        let mut router = Router::new();
        router.add_route("/fail", |_| Err(ServerError::HandlerFailure("boom".to_string())));
        let dispatcher = dispatcher(router, Arc::new(MemorySink::default()));

        let (ctx, transport) = context(b"GET /fail HTTP/1.1\r\n\r\n");
        let result = dispatcher.dispatch(ctx);
        assert!(matches!(result, Err(ServerError::HandlerFailure(_))));
        assert!(transport.text().is_empty());
    }

    #[test]
    fn test_handler_panic_is_caught() {
        let mut router = Router::new();
        router.add_route("/panic", |_| panic!("handler exploded"));
        let dispatcher = dispatcher(router, Arc::new(MemorySink::default()));

        let (ctx, _transport) = context(b"GET /panic HTTP/1.1\r\n\r\n");
        match dispatcher.dispatch_guarded(ctx) {
            Err(ServerError::HandlerFailure(msg)) => assert!(msg.contains("handler exploded")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_header_without_separator_keeps_route() {
        let mut router = Router::new();
        router.add_route("/", |ctx| ctx.response.ok().end_text("ROOT"));
        router.add_route("/items/:id/delete", |ctx| {
            let body = format!("DELETED {}", ctx.param("id").unwrap_or("?"));
            ctx.response.ok().end_text(&body)
        });
        let dispatcher = dispatcher(router, Arc::new(MemorySink::default()));

        let (ctx, transport) = context(b"POST /items/5/delete HTTP/1.1\r\nHost:localhost\r\n\r\n");
        assert_eq!(ctx.request.method(), "POST");
        dispatcher.dispatch(ctx).unwrap();
        assert!(transport.text().ends_with("\r\n\r\nDELETED 5"));
    }
}
