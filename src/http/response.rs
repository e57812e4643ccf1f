//! Response representation and wire serialization.

use super::error::HttpError;
use bytes::{Bytes, BytesMut};
use std::io;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version written on every status line
pub const VERSION: &str = "HTTP/1.1";

/// File bodies are streamed in chunks of this size
pub const FILE_CHUNK_SIZE: usize = 1024;

/// Status codes the server can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Created,
    NotFound,
    InternalServerError,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::Created => 201,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Created => "Created",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
        }
    }
}

/// Response payload.
#[derive(Debug)]
pub enum Body {
    Empty,
    /// In-memory bytes, written together with the head.
    Full(Bytes),
    /// Open file of known length, streamed after the head.
    File { file: File, len: u64 },
}

/// A response built by a route handler and consumed once by the writer.
#[derive(Debug)]
pub struct Response {
    status: Status,
    /// Wire order is insertion order.
    headers: Vec<(&'static str, String)>,
    body: Body,
}

impl Response {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn ok() -> Self {
        Self::new(Status::Ok)
    }

    pub fn created() -> Self {
        Self::new(Status::Created)
    }

    pub fn not_found() -> Self {
        Self::new(Status::NotFound)
    }

    pub fn internal_error() -> Self {
        Self::new(Status::InternalServerError)
    }

    /// `200 OK` with a `text/plain` body.
    pub fn text(body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self::ok()
            .header("Content-Type", "text/plain")
            .header("Content-Length", body.len().to_string())
            .with_body(Body::Full(body))
    }

    /// `200 OK` streaming `len` bytes of `file` as `application/octet-stream`.
    pub fn file(file: File, len: u64) -> Self {
        Self::ok()
            .header("Content-Type", "application/octet-stream")
            .header("Content-Length", len.to_string())
            .with_body(Body::File { file, len })
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    #[cfg(test)]
    pub fn headers(&self) -> &[(&'static str, String)] {
        &self.headers
    }

    #[cfg(test)]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[cfg(test)]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Serialize the status line, headers and blank line.
    pub fn encode_head(&self) -> BytesMut {
        let mut head = BytesMut::with_capacity(64 + self.headers.len() * 32);
        head.extend_from_slice(
            format!("{} {} {}\r\n", VERSION, self.status.code(), self.status.reason()).as_bytes(),
        );
        for (name, value) in &self.headers {
            head.extend_from_slice(name.as_bytes());
            head.extend_from_slice(b": ");
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }
        head.extend_from_slice(b"\r\n");
        head
    }

    /// Write the whole response and flush.
    ///
    /// Head and in-memory body go out in a single write. A file body follows
    /// the head in `FILE_CHUNK_SIZE` chunks; a failure there leaves a
    /// truncated response on the wire, and the caller must drop the
    /// connection.
    pub async fn write_to<W>(self, writer: &mut W) -> Result<(), HttpError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut head = self.encode_head();

        match self.body {
            Body::Empty => writer.write_all(&head).await?,
            Body::Full(bytes) => {
                head.extend_from_slice(&bytes);
                writer.write_all(&head).await?;
            }
            Body::File { file, len } => {
                writer.write_all(&head).await?;
                stream_file(file, len, writer).await?;
            }
        }

        writer.flush().await?;
        Ok(())
    }
}

/// Copy exactly `len` bytes of `file` to `writer`.
async fn stream_file<W>(mut file: File, len: u64, writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut chunk = [0u8; FILE_CHUNK_SIZE];
    let mut remaining = len;

    while remaining > 0 {
        let want = remaining.min(FILE_CHUNK_SIZE as u64) as usize;
        let n = file.read(&mut chunk[..want]).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("file ended with {remaining} of {len} bytes unsent"),
            ));
        }
        writer.write_all(&chunk[..n]).await?;
        remaining -= n as u64;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn wire(response: Response) -> Vec<u8> {
        let mut out = Vec::new();
        response.write_to(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_empty_ok() {
        assert_eq!(wire(Response::ok()).await, b"HTTP/1.1 200 OK\r\n\r\n");
    }

    #[tokio::test]
    async fn test_status_lines() {
        assert_eq!(wire(Response::created()).await, b"HTTP/1.1 201 Created\r\n\r\n");
        assert_eq!(wire(Response::not_found()).await, b"HTTP/1.1 404 Not Found\r\n\r\n");
        assert_eq!(
            wire(Response::internal_error()).await,
            b"HTTP/1.1 500 Internal Server Error\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_text_body() {
        let out = wire(Response::text("abc")).await;
        assert_eq!(
            out,
            b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 3\r\n\r\nabc"
        );
    }

    #[test]
    fn test_header_order_preserved() {
        let response = Response::ok().header("B", "2").header("A", "1");
        assert_eq!(
            &response.encode_head()[..],
            b"HTTP/1.1 200 OK\r\nB: 2\r\nA: 1\r\n\r\n"
        );
        assert_eq!(response.get_header("A"), Some("1"));
        assert_eq!(response.get_header("C"), None);
    }

    #[tokio::test]
    async fn test_file_body_streamed_in_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob");
        let data: Vec<u8> = (0..3 * FILE_CHUNK_SIZE + 17).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let file = File::open(&path).await.unwrap();
        let out = wire(Response::file(file, data.len() as u64)).await;

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
            data.len()
        );
        assert_eq!(&out[..head.len()], head.as_bytes());
        assert_eq!(&out[head.len()..], &data[..]);
    }

    #[tokio::test]
    async fn test_file_shorter_than_declared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short");
        std::fs::write(&path, b"1234").unwrap();

        let file = File::open(&path).await.unwrap();
        let mut out = Vec::new();
        let err = Response::file(file, 10).write_to(&mut out).await.unwrap_err();

        assert!(matches!(err, HttpError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
        // Head and the available bytes are already on the wire
        assert!(out.ends_with(b"\r\n\r\n1234"));
    }
}
