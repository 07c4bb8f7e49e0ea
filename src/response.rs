use crate::error::{ServerError, ServerResult};
use crate::http::Status;
use bytes::BytesMut;
use std::fmt;
use std::io::{self, Write};
use std::net::{Shutdown, TcpStream};

/// The write half a [`Response`] serializes onto.
pub trait Transport: Write + Send {
    /// Signal that no more bytes will be written
    fn close(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Write)
    }
}

/// Accumulates a status line, header lines and one of two body channels,
/// then writes the framed response in a single shot.
///
/// The text channel (`add_body`, `set_content`, ...) is drained by
/// [`finalize_text`](Response::finalize_text), the byte channel (`add_bytes`,
/// `set_bytes`) by [`finalize_binary`](Response::finalize_binary). Header lines
/// are written verbatim in insertion order and never deduplicated;
/// `Content-Length` is always appended last by the finalizer.
pub struct Response {
    status_line: Option<String>,
    headers: Vec<(String, String)>,
    text_body: String,
    binary_body: BytesMut,
    transport: Box<dyn Transport>,
    finalized: bool,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status_line", &self.status_line)
            .field("headers", &self.headers)
            .field("text_body_len", &self.text_body.len())
            .field("binary_body_len", &self.binary_body.len())
            .field("finalized", &self.finalized)
            .finish()
    }
}

impl Response {
    /// Create an empty response bound to `transport`
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            status_line: None,
            headers: Vec::new(),
            text_body: String::new(),
            binary_body: BytesMut::new(),
            transport,
            finalized: false,
        }
    }

    /// Set the status line. A later call replaces an earlier one.
    pub fn set_status(&mut self, code: u16, reason: &str) -> &mut Self {
        self.status_line = Some(format!("HTTP/1.1 {} {}", code, reason));
        self
    }

    pub fn status(&mut self, status: Status) -> &mut Self {
        self.set_status(status.code(), status.reason())
    }

    /// Append a header line as `name: value`
    pub fn add_header(&mut self, name: &str, value: &str) -> &mut Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn set_content_type(&mut self, content_type: &str) -> &mut Self {
        self.add_header("Content-Type", content_type)
    }

    pub fn content_text_html(&mut self) -> &mut Self {
        self.set_content_type("text/html;charset=utf-8")
    }

    pub fn content_plain_text(&mut self) -> &mut Self {
        self.set_content_type("text/plain;charset=utf-8")
    }

    pub fn content_json(&mut self) -> &mut Self {
        self.set_content_type("application/json;charset=utf-8")
    }

    pub fn content_octet_stream(&mut self) -> &mut Self {
        self.set_content_type("application/octet-stream;charset=utf-8")
    }

    pub fn content_text_css(&mut self) -> &mut Self {
        self.set_content_type("text/css;charset=utf-8")
    }

    pub fn content_text_js(&mut self) -> &mut Self {
        self.set_content_type("text/javascript;charset=utf-8")
    }

    /// Append a fragment to the text body
    pub fn add_body(&mut self, fragment: &str) -> &mut Self {
        self.text_body.push_str(fragment);
        self
    }

    /// Append a fragment followed by CRLF to the text body
    pub fn append_line(&mut self, line: &str) -> &mut Self {
        self.text_body.push_str(line);
        self.text_body.push_str("\r\n");
        self
    }

    /// Replace the text body
    pub fn set_content(&mut self, content: &str) -> &mut Self {
        self.text_body.clear();
        self.text_body.push_str(content);
        self
    }

    /// Append bytes to the binary body
    pub fn add_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.binary_body.extend_from_slice(bytes);
        self
    }

    /// Replace the binary body
    pub fn set_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.binary_body.clear();
        self.binary_body.extend_from_slice(bytes);
        self
    }

    /// `200 OK` without a body or content type
    pub fn ok(&mut self) -> &mut Self {
        self.status(Status::Ok)
    }

    /// `301 Moved Permanently` pointing at `location`
    pub fn moved_permanently(&mut self, location: &str) -> &mut Self {
        self.status(Status::MovedPermanently)
            .add_header("Location", location)
    }

    pub fn forbidden(&mut self) -> &mut Self {
        self.status(Status::Forbidden)
            .set_content_type("text/html")
            .add_body("<h1>403 Forbidden</h1>")
    }

    pub fn not_found(&mut self) -> &mut Self {
        self.status(Status::NotFound)
            .set_content_type("text/html")
            .add_body("<h1>404 Not Found</h1>")
    }

    pub fn internal_error(&mut self) -> &mut Self {
        self.status(Status::InternalServerError)
            .set_content_type("text/html")
            .add_body("<h1>500 Internal Server Error</h1>")
    }

    /// `500 Internal Server Error` with an extra detail paragraph
    pub fn internal_error_with(&mut self, detail: &str) -> &mut Self {
        self.internal_error().add_body(&format!("<p>{}</p>", detail))
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Serialize status, headers and the text body, write them and close.
    pub fn finalize_text(&mut self) -> ServerResult<()> {
        self.begin_finalize()?;
        let body = std::mem::take(&mut self.text_body);
        let mut out = self.encode_head(body.len()).into_bytes();
        out.extend_from_slice(body.as_bytes());
        self.write_and_close(&out)
    }

    /// Serialize status, headers and the binary body, write them and close.
    pub fn finalize_binary(&mut self) -> ServerResult<()> {
        self.begin_finalize()?;
        let body = self.binary_body.split().freeze();
        let mut out = self.encode_head(body.len()).into_bytes();
        out.extend_from_slice(&body);
        self.write_and_close(&out)
    }

    /// Append `body` to the text channel and finalize
    pub fn end_text(&mut self, body: &str) -> ServerResult<()> {
        self.add_body(body);
        self.finalize_text()
    }

    /// Append `bytes` to the binary channel and finalize
    pub fn end_binary(&mut self, bytes: &[u8]) -> ServerResult<()> {
        self.add_bytes(bytes);
        self.finalize_binary()
    }

    fn begin_finalize(&mut self) -> ServerResult<()> {
        if self.finalized {
            return Err(ServerError::AlreadyFinalized);
        }
        self.finalized = true;
        Ok(())
    }

    fn encode_head(&self, content_length: usize) -> String {
        let mut head = String::with_capacity(128);
        head.push_str(self.status_line.as_deref().unwrap_or("HTTP/1.1 200 OK"));
        head.push_str("\r\n");
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("Content-Length: ");
        head.push_str(&content_length.to_string());
        head.push_str("\r\n\r\n");
        head
    }

    fn write_and_close(&mut self, out: &[u8]) -> ServerResult<()> {
        self.transport
            .write_all(out)
            .and_then(|_| self.transport.flush())
            .map_err(ServerError::WriteFailure)?;
        self.transport.close().map_err(ServerError::WriteFailure)?;
        log::trace!("response finalized, {} bytes written", out.len());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// In-memory transport that records everything written to it
    #[derive(Clone, Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) written: Arc<Mutex<Vec<u8>>>,
        pub(crate) closed: Arc<Mutex<usize>>,
    }

    impl RecordingTransport {
        pub(crate) fn text(&self) -> String {
            String::from_utf8_lossy(&self.written.lock()).into_owned()
        }
    }

    impl Write for RecordingTransport {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for RecordingTransport {
        fn close(&mut self) -> io::Result<()> {
            *self.closed.lock() += 1;
            Ok(())
        }
    }

    struct BrokenTransport;

    impl Write for BrokenTransport {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Transport for BrokenTransport {
        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn recording_response() -> (Response, RecordingTransport) {
        let transport = RecordingTransport::default();
        (Response::new(Box::new(transport.clone())), transport)
    }

    #[test]
    fn test_text_response_bytes() {
        let (mut response, transport) = recording_response();
        response
            .set_status(200, "OK")
            .set_content_type("text/plain")
            .add_body("hi");
        response.finalize_text().unwrap();

        assert_eq!(
            transport.text(),
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nhi"
        );
        assert_eq!(*transport.closed.lock(), 1);
    }

    #[test]
    fn test_content_length_counts_utf8_bytes() {
        let (mut response, transport) = recording_response();
        response.ok().end_text("héllo").unwrap();
        assert!(transport.text().contains("Content-Length: 6\r\n"));
    }

    #[test]
    fn test_binary_response_bytes() {
        let (mut response, transport) = recording_response();
        response
            .ok()
            .set_content_type("image/png")
            .add_bytes(&[0x89, 0x50])
            .add_bytes(&[0x00, 0xff]);
        response.finalize_binary().unwrap();

        let written = transport.written.lock().clone();
        let head = b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 4\r\n\r\n";
        assert_eq!(&written[..head.len()], head);
        assert_eq!(&written[head.len()..], &[0x89, 0x50, 0x00, 0xff]);
    }

    #[test]
    fn test_body_channels_are_independent() {
        let (mut response, transport) = recording_response();
        response.ok().add_body("text").add_bytes(b"binary!");
        response.finalize_binary().unwrap();
        let text = transport.text();
        assert!(text.ends_with("Content-Length: 7\r\n\r\nbinary!"));
        assert!(!text.contains("text"));
    }

    #[test]
    fn test_headers_are_not_deduplicated() {
        let (mut response, transport) = recording_response();
        response
            .ok()
            .add_header("Set-Cookie", "a=1")
            .add_header("Set-Cookie", "b=2");
        response.finalize_text().unwrap();
        assert_eq!(
            transport.text(),
            "HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\nContent-Length: 0\r\n\r\n"
        );
    }

    #[test]
    fn test_set_content_replaces_and_append_line_adds_crlf() {
        let (mut response, transport) = recording_response();
        response.add_body("discarded").set_content("first").append_line("");
        response.append_line("second");
        response.finalize_text().unwrap();
        assert!(transport.text().ends_with("\r\n\r\nfirst\r\nsecond\r\n"));
    }

    #[test]
    fn test_missing_status_defaults_to_ok() {
        let (mut response, transport) = recording_response();
        response.end_text("x").unwrap();
        assert!(transport.text().starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn test_status_helpers() {
        let (mut response, transport) = recording_response();
        response.not_found().finalize_text().unwrap();
        assert_eq!(
            transport.text(),
            "HTTP/1.1 404 Not Found\r\nContent-Type: text/html\r\nContent-Length: 22\r\n\r\n<h1>404 Not Found</h1>"
        );

        let (mut response, transport) = recording_response();
        response.moved_permanently("/new").finalize_text().unwrap();
        assert_eq!(
            transport.text(),
            "HTTP/1.1 301 Moved Permanently\r\nLocation: /new\r\nContent-Length: 0\r\n\r\n"
        );

        let (mut response, transport) = recording_response();
        response.internal_error_with("disk on fire").finalize_text().unwrap();
        let text = transport.text();
        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(text.ends_with("<h1>500 Internal Server Error</h1><p>disk on fire</p>"));

        let (mut response, transport) = recording_response();
        response.forbidden().finalize_text().unwrap();
        assert!(transport.text().ends_with("<h1>403 Forbidden</h1>"));
    }

    #[test]
    fn test_second_finalize_is_rejected() {
        let (mut response, transport) = recording_response();
        response.ok().end_text("once").unwrap();
        let written = transport.written.lock().len();

        assert!(matches!(response.finalize_text(), Err(ServerError::AlreadyFinalized)));
        assert!(matches!(response.finalize_binary(), Err(ServerError::AlreadyFinalized)));
        assert_eq!(transport.written.lock().len(), written);
        assert_eq!(*transport.closed.lock(), 1);
        assert!(response.is_finalized());
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut response = Response::new(Box::new(BrokenTransport));
        let result = response.ok().end_text("lost");
        assert!(matches!(result, Err(ServerError::WriteFailure(_))));
    }
}
