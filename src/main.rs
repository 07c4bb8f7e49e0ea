use micro_route_server::html::{a, div, h1, li, p, ul};
use micro_route_server::{static_file_handler, HtmlBuilder, HttpServer, ServerConfig, ServerResult};
use std::env;
use std::path::Path;
use std::sync::mpsc;

fn main() -> ServerResult<()> {
    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let config = if args.len() > 1 && Path::new(&args[1]).exists() {
        // Load configuration from file
        ServerConfig::from_json_file(&args[1])?
    } else {
        // Use default configuration
        ServerConfig::new()
    };

    let mut server = HttpServer::with_config(config.clone());

    server.route("/", |ctx| {
        ctx.response
            .ok()
            .content_text_html()
            .add_body("<h1>micro-route-server</h1>")
            .append_line("<p>Try /hello/you, /echo?msg=hi or /page</p>");
        ctx.response.finalize_text()
    });

    server.route("/page", |ctx| {
        let page = HtmlBuilder::new()
            .utf8()
            .title("micro-route-server")
            .css("body { font-family: sans-serif; }")
            .body([
                h1("Demo page"),
                div([
                    p("Built with HtmlBuilder"),
                    ul([li([a("hello", "/hello/page")]), li([a("echo", "/echo?msg=page")])]),
                ])
                .clazz("container"),
            ]);
        ctx.response.ok().content_text_html().end_text(&page.format())
    });

    server.route("/hello/:name", |ctx| {
        let body = format!("<h1>Hello, {}!</h1>", ctx.param("name").unwrap_or("world"));
        ctx.response.ok().content_text_html().end_text(&body)
    });

    server.route("/echo", |ctx| {
        let msg = ctx.request.query("msg").unwrap_or_default().to_string();
        ctx.response.ok().content_plain_text().end_text(&msg)
    });

    server.route("/old", |ctx| ctx.response.moved_permanently("/").finalize_text());

    if let Some(root) = &config.static_root {
        server.set_default_handler_fn(static_file_handler(root, &config.static_prefix));
    }

    server.start()?;

    // Block until Ctrl-C, then stop the accept loop
    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .map_err(|e| micro_route_server::ServerError::Config(format!("signal handler: {}", e)))?;

    let _ = rx.recv();
    println!("Received shutdown signal. Stopping server...");
    server.stop()
}
