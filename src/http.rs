use crate::error::{ServerError, ServerResult};
use std::borrow::Cow;
use std::collections::HashMap;

const CRLF: &[u8] = b"\r\n";
const HEADER_END: &[u8] = b"\r\n\r\n";

/// HTTP Status Codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 200,
    Created = 201,
    NoContent = 204,

    MovedPermanently = 301,
    Found = 302,
    NotModified = 304,

    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,

    InternalServerError = 500,
    NotImplemented = 501,
    ServiceUnavailable = 503,
}

impl Status {
    /// Numeric status code
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the reason phrase for this status code
    pub fn reason(&self) -> &'static str {
        match *self {
            Status::Ok => "OK",
            Status::Created => "Created",
            Status::NoContent => "No Content",

            Status::MovedPermanently => "Moved Permanently",
            Status::Found => "Found",
            Status::NotModified => "Not Modified",

            Status::BadRequest => "Bad Request",
            Status::Unauthorized => "Unauthorized",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",

            Status::InternalServerError => "Internal Server Error",
            Status::NotImplemented => "Not Implemented",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// A parsed HTTP request.
///
/// Built once from the bytes of a single read and read-only afterwards.
/// Header names are kept exactly as sent; a repeated header keeps its last value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    target: String,
    version: String,
    headers: HashMap<String, String>,
    query_params: HashMap<String, String>,
    cookies: HashMap<String, String>,
    body: Vec<u8>,
}

impl Default for Request {
    /// `GET / HTTP/1.1` with no headers and no body
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            target: "/".to_string(),
            version: "HTTP/1.1".to_string(),
            headers: HashMap::new(),
            query_params: HashMap::new(),
            cookies: HashMap::new(),
            body: Vec::new(),
        }
    }
}

impl Request {
    /// Parse a request from the raw bytes of one read.
    ///
    /// An empty buffer yields [`Request::default`]. A missing CRLF after the
    /// request line, or a request line that is not exactly `METHOD SP TARGET SP
    /// VERSION`, is reported as [`ServerError::RequestMalformed`]. Header
    /// lines without `": "` are skipped.
    pub fn parse(data: &[u8]) -> ServerResult<Self> {
        if data.is_empty() {
            return Ok(Self::default());
        }

        let (line_end, mut request) = Self::from_request_line(data)?;

        // The header block sits between the request line and the first blank line.
        // Without a blank line everything after the request line is headers.
        let (head_end, body_start) = match find(data, HEADER_END) {
            Some(pos) => (pos, pos + HEADER_END.len()),
            None => (data.len(), data.len()),
        };
        let header_block = if head_end > line_end {
            String::from_utf8_lossy(&data[line_end + CRLF.len()..head_end])
        } else {
            Cow::Borrowed("")
        };

        let mut headers = HashMap::new();
        for line in header_block.split("\r\n").filter(|line| !line.is_empty()) {
            match line.split_once(": ") {
                Some((name, value)) => {
                    headers.insert(name.to_string(), value.to_string());
                }
                None => log::debug!("skipping header line without separator: {:?}", line),
            }
        }

        // Looked up by name, not taken from whichever header line comes first.
        request.cookies = headers
            .get("Cookie")
            .map(|value| parse_cookies(value))
            .unwrap_or_default();
        request.headers = headers;
        request.body = data[body_start..].to_vec();

        Ok(request)
    }

    /// Request line fields and query, plus the offset of the CRLF ending the line.
    fn from_request_line(data: &[u8]) -> ServerResult<(usize, Self)> {
        let line_end = find(data, CRLF).ok_or_else(|| {
            ServerError::RequestMalformed("missing CRLF after request line".to_string())
        })?;
        let request_line = String::from_utf8_lossy(&data[..line_end]);
        let (method, target, version) = parse_request_line(&request_line)?;

        let query_params = match target.split_once('?') {
            Some((_, query)) => parse_query(query),
            None => HashMap::new(),
        };

        let request = Self {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
            query_params,
            ..Self::default()
        };
        Ok((line_end, request))
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request target as sent, including any `?query` suffix
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The request target with the `?query` suffix removed
    pub fn path(&self) -> &str {
        strip_query(&self.target)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Look up a header by its exact (case-sensitive) name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    pub fn cookies(&self) -> &HashMap<String, String> {
        &self.cookies
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body decoded as UTF-8, with invalid sequences replaced
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Parse a `&`-separated query string.
///
/// A piece without `=` (or starting with `=`) maps in full to an empty value.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    parse_pairs(query, "&")
}

/// Parse a `Cookie` header value of `; `-separated pairs
pub fn parse_cookies(value: &str) -> HashMap<String, String> {
    parse_pairs(value, "; ")
}

/// Return `target` without its `?query` suffix
pub fn strip_query(target: &str) -> &str {
    match target.find('?') {
        Some(pos) => &target[..pos],
        None => target,
    }
}

fn parse_pairs(input: &str, separator: &str) -> HashMap<String, String> {
    let mut pairs = HashMap::new();
    for pair in input.split(separator).filter(|pair| !pair.is_empty()) {
        match pair.find('=') {
            Some(pos) if pos > 0 => {
                pairs.insert(pair[..pos].to_string(), pair[pos + 1..].to_string());
            }
            _ => {
                pairs.insert(pair.to_string(), String::new());
            }
        }
    }
    pairs
}

fn parse_request_line(line: &str) -> ServerResult<(&str, &str, &str)> {
    let parts: Vec<&str> = line.split(' ').collect();
    match parts.as_slice() {
        [method, target, version]
            if !method.is_empty() && !target.is_empty() && !version.is_empty() =>
        {
            Ok((*method, *target, *version))
        }
        _ => Err(ServerError::RequestMalformed(format!(
            "invalid request line: {:?}",
            line
        ))),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_is_default_request() {
        let request = Request::parse(b"").unwrap();
        assert_eq!(request.method(), "GET");
        assert_eq!(request.target(), "/");
        assert_eq!(request.version(), "HTTP/1.1");
        assert!(request.headers().is_empty());
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_request_without_headers() {
        let request = Request::parse(b"DELETE /items/4 HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(request.method(), "DELETE");
        assert_eq!(request.target(), "/items/4");
        assert_eq!(request.version(), "HTTP/1.0");
        assert!(request.headers().is_empty());
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_header_block_without_blank_line() {
        let request = Request::parse(b"GET / HTTP/1.1\r\nHost: a\r\n").unwrap();
        assert_eq!(request.header("Host"), Some("a"));
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_duplicate_header_last_write_wins() {
        let request =
            Request::parse(b"GET / HTTP/1.1\r\nX-Tag: one\r\nX-Tag: two\r\n\r\n").unwrap();
        assert_eq!(request.header("X-Tag"), Some("two"));
        assert_eq!(request.header("x-tag"), None);
    }

    #[test]
    fn test_header_value_keeps_extra_separators() {
        let request = Request::parse(b"GET / HTTP/1.1\r\nX-Note: a: b\r\n\r\n").unwrap();
        assert_eq!(request.header("X-Note"), Some("a: b"));
    }

    #[test]
    fn test_body_keeps_raw_bytes() {
        let data = b"POST /upload HTTP/1.1\r\nContent-Length: 5\r\n\r\n\x00\xffa\r\n";
        let request = Request::parse(data).unwrap();
        assert_eq!(request.body(), b"\x00\xffa\r\n");
    }

    #[test]
    fn test_query_parsing() {
        let request = Request::parse(b"GET /search?q=cats&empty HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(request.path(), "/search");
        assert_eq!(request.query_params().len(), 2);
        assert_eq!(request.query("q"), Some("cats"));
        assert_eq!(request.query("empty"), Some(""));
    }

    #[test]
    fn test_query_value_split_at_first_equals() {
        let params = parse_query("expr=a=b&=lead&&x=");
        assert_eq!(params.get("expr").map(String::as_str), Some("a=b"));
        assert_eq!(params.get("=lead").map(String::as_str), Some(""));
        assert_eq!(params.get("x").map(String::as_str), Some(""));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_cookie_parsing() {
        let cookies = parse_cookies("a=1; b=2");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies.get("a").map(String::as_str), Some("1"));
        assert_eq!(cookies.get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_cookie_header_found_by_name() {
        let data = b"GET / HTTP/1.1\r\nHost: localhost\r\nCookie: session=abc; theme\r\n\r\n";
        let request = Request::parse(data).unwrap();
        assert_eq!(request.cookie("session"), Some("abc"));
        assert_eq!(request.cookie("theme"), Some(""));
    }

    #[test]
    fn test_missing_cookie_header_is_empty() {
        let request = Request::parse(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").unwrap();
        assert!(request.cookies().is_empty());
    }

    #[test]
    fn test_malformed_inputs() {
        let cases: [&[u8]; 4] = [
            b"GET / HTTP/1.1",
            b"GET /\r\n\r\n",
            b"GET  / HTTP/1.1\r\n\r\n",
            b"GET / HTTP/1.1 extra\r\n\r\n",
        ];
        for data in cases {
            let result = Request::parse(data);
            assert!(
                matches!(result, Err(ServerError::RequestMalformed(_))),
                "expected malformed for {:?}",
                String::from_utf8_lossy(data)
            );
        }
    }

    #[test]
    fn test_header_line_without_separator_is_skipped() {
        let request = Request::parse(
            b"POST /items/5/delete HTTP/1.1\r\nHost:localhost\r\nAccept: */*\r\n\r\nx",
        )
        .unwrap();
        assert_eq!(request.method(), "POST");
        assert_eq!(request.target(), "/items/5/delete");
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("Accept"), Some("*/*"));
        assert_eq!(request.header("Host:localhost"), None);
        assert_eq!(request.body(), b"x");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(Status::Ok.code(), 200);
        assert_eq!(Status::MovedPermanently.reason(), "Moved Permanently");
        assert_eq!(Status::NotFound.code(), 404);
        assert_eq!(Status::InternalServerError.reason(), "Internal Server Error");
    }
}
