use criterion::{black_box, criterion_group, criterion_main, Criterion};
use micro_route_server::{match_path, Request, Response, Router, Transport};
use std::io::{self, Write};

struct Sink;

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for Sink {
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn benchmark_http_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("http_parser");

    let simple_request = "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";

    group.bench_function("parse_simple_request", |b| {
        b.iter(|| {
            let request = Request::parse(black_box(simple_request.as_bytes())).unwrap();
            assert_eq!(request.target(), "/");
        })
    });

    let complex_request = "POST /api/items?sort=asc&page=3 HTTP/1.1\r\n\
                          Host: example.com\r\n\
                          Content-Type: application/json\r\n\
                          Content-Length: 27\r\n\
                          Cookie: session=abc; theme=dark\r\n\
                          Accept: */*\r\n\
                          \r\n\
                          {\"name\":\"test\",\"value\":123}";

    group.bench_function("parse_complex_request", |b| {
        b.iter(|| {
            let request = Request::parse(black_box(complex_request.as_bytes())).unwrap();
            assert_eq!(request.method(), "POST");
            assert_eq!(request.body().len(), 27);
        })
    });

    group.finish();
}

fn benchmark_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("router");

    group.bench_function("match_path_params", |b| {
        b.iter(|| match_path(black_box("/users/:id/posts/:post_id"), black_box("/users/42/posts/7")))
    });

    let mut router = Router::new();
    for i in 0..50 {
        router.add_route(&format!("/resource{}/:id", i), |_| Ok(()));
    }

    group.bench_function("resolve_last_of_50", |b| {
        b.iter(|| {
            let (route, _) = router.resolve(black_box("/resource49/abc?x=1")).unwrap();
            assert_eq!(route.pattern(), "/resource49/:id");
        })
    });

    group.finish();
}

fn benchmark_response(c: &mut Criterion) {
    c.bench_function("finalize_text", |b| {
        b.iter(|| {
            let mut response = Response::new(Box::new(Sink));
            response
                .ok()
                .content_json()
                .add_body(black_box("{\"status\":\"ok\"}"))
                .finalize_text()
                .unwrap();
        })
    });
}

criterion_group!(benches, benchmark_http_parsing, benchmark_routing, benchmark_response);
criterion_main!(benches);
