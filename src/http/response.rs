//! HTTP/1.1 response builder.
//!
//! Provides a fluent builder API for constructing HTTP responses and writing
//! them to a socket. Bodies are either buffered or streamed from an
//! [`AsyncRead`] source such as an open file.

use std::fmt;
use std::io;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{Headers, StatusCode};

/// A boxed byte source piped into the response after the head is written.
pub type BodyStream = Box<dyn AsyncRead + Send + Unpin>;

/// A response body.
pub enum Body {
    /// Bytes held in memory. `Content-Length` is derived from the length.
    Full(Vec<u8>),
    /// Bytes copied from a reader once the head has been sent.
    Stream(BodyStream),
}

impl Body {
    /// Reads the whole body into memory.
    ///
    /// # Errors
    ///
    /// Propagates any error raised by the underlying stream.
    pub async fn collect(self) -> io::Result<Vec<u8>> {
        match self {
            Self::Full(bytes) => Ok(bytes),
            Self::Stream(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                Ok(buf)
            }
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::Full(Vec::new())
    }
}

/// An HTTP/1.1 response, ready to be written to a connection.
///
/// # Examples
///
/// ```
/// use rserve::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::Found)
///     .header("Location", "/new")
///     .body("");
///
/// let bytes = response.into_bytes();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 302 Found\r\n"));
/// assert!(text.contains("Location: /new\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Body,
    keep_alive: bool,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::default(),
            keep_alive: true,
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the whole header map.
    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Sets a header in-place, replacing any previous value.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Returns the first value of a response header, if set.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Returns the response headers.
    pub fn header_map(&self) -> &Headers {
        &self.headers
    }

    /// Sets the response body from a string.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Body::Full(body.into().into_bytes());
        self
    }

    /// Sets the response body from raw bytes.
    #[must_use]
    pub fn body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Body::Full(body.into());
        self
    }

    /// Pipes `reader` into the connection after the head.
    ///
    /// Set `Content-Length` yourself; without it the connection is closed to
    /// delimit the body.
    #[must_use]
    pub fn stream(mut self, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        self.body = Body::Stream(Box::new(reader));
        self
    }

    /// Controls whether the `Connection: keep-alive` or `Connection: close` header is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Returns `true` if the connection can carry another request afterwards.
    pub fn is_keep_alive(&self) -> bool {
        self.keep_alive && !self.is_unbounded_stream()
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Consumes the response and returns its body.
    pub fn into_body(self) -> Body {
        self.body
    }

    fn is_unbounded_stream(&self) -> bool {
        matches!(self.body, Body::Stream(_)) && !self.headers.contains("content-length")
    }

    /// Serializes the status line and headers.
    ///
    /// Automatically adds:
    /// - `Content-Type: text/plain; charset=utf-8` if a buffered body is non-empty
    ///   and no `Content-Type` header was set.
    /// - `Content-Length: <n>` for buffered bodies unless already present.
    /// - `Connection: keep-alive` or `Connection: close`.
    fn encode_head(&mut self) -> BytesMut {
        let keep_alive = self.is_keep_alive();

        if let Body::Full(bytes) = &self.body {
            if !bytes.is_empty() && !self.headers.contains("content-type") {
                self.headers
                    .insert("Content-Type", "text/plain; charset=utf-8");
            }
            if !self.headers.contains("content-length") {
                self.headers.insert("Content-Length", bytes.len().to_string());
            }
        }

        let connection = if keep_alive { "keep-alive" } else { "close" };
        self.headers.set("Connection", connection);

        let mut buf = BytesMut::with_capacity(128 + self.headers.len() * 64);

        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason()
            )
            .as_bytes(),
        );

        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }

        buf.put(&b"\r\n"[..]);
        buf
    }

    /// Serializes a buffered response into HTTP/1.1 wire format.
    ///
    /// A streamed body is not read; only the head is returned for it.
    pub fn into_bytes(mut self) -> BytesMut {
        let mut buf = self.encode_head();
        if let Body::Full(bytes) = &self.body {
            buf.put(bytes.as_slice());
        }
        buf
    }

    /// Writes the head and then the body to `writer`, copying streamed bodies
    /// chunk by chunk.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error from either the writer or the body stream.
    pub async fn write_to<W>(mut self, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let head = self.encode_head();
        writer.write_all(&head).await?;

        match self.body {
            Body::Full(bytes) => writer.write_all(&bytes).await?,
            Body::Stream(mut reader) => {
                tokio::io::copy(&mut reader, writer).await?;
            }
        }

        writer.flush().await
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn simple_ok_response() {
        let r = Response::new(StatusCode::Ok).body("Hello");
        let s = to_string(r.into_bytes());
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn explicit_content_length_is_kept() {
        let r = Response::new(StatusCode::Ok)
            .header("Content-Length", "42")
            .body("");
        let s = to_string(r.into_bytes());
        assert!(s.contains("Content-Length: 42\r\n"));
        assert!(!s.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn set_header_overwrites() {
        let mut r = Response::new(StatusCode::NotFound).header("Content-Type", "text/html");
        r.set_header("content-type", "application/json; charset=utf-8");
        assert_eq!(
            r.header_value("Content-Type"),
            Some("application/json; charset=utf-8")
        );
    }

    #[test]
    fn connection_close() {
        let r = Response::new(StatusCode::Ok).keep_alive(false);
        let s = to_string(r.into_bytes());
        assert!(s.contains("Connection: close\r\n"));
    }

    #[test]
    fn stream_without_length_closes() {
        let r = Response::new(StatusCode::Ok).stream(std::io::Cursor::new(b"abc".to_vec()));
        assert!(!r.is_keep_alive());

        let r = Response::new(StatusCode::Ok)
            .header("Content-Length", "3")
            .stream(std::io::Cursor::new(b"abc".to_vec()));
        assert!(r.is_keep_alive());
    }

    #[tokio::test]
    async fn write_to_copies_stream() {
        let r = Response::new(StatusCode::Ok)
            .header("Content-Length", "3")
            .stream(std::io::Cursor::new(b"abc".to_vec()));
        let mut out = Vec::new();
        r.write_to(&mut out).await.unwrap();
        let s = String::from_utf8(out).unwrap();
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Length: 3\r\n"));
        assert!(s.ends_with("\r\n\r\nabc"));
    }

    #[tokio::test]
    async fn collect_body() {
        let r = Response::new(StatusCode::Ok).stream(std::io::Cursor::new(b"xyz".to_vec()));
        assert_eq!(r.into_body().collect().await.unwrap(), b"xyz");
    }
}
