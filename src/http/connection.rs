//! Per-connection driver.
//!
//! Each accepted connection serves exactly one request:
//!
//! ```text
//! Reading -> Routing -> Handling -> Writing -> Closed
//!     \          \          \          \
//!      +----------+----------+----------+--> Errored -> Closed
//! ```
//!
//! Read and parse failures close the connection without a response. Once the
//! head of a response is on the wire nothing else is written.

use super::parser::{parse_head, ParseResult};
use super::request::Request;
use super::router::{Route, RouteOutcome};
use super::{Context, HttpError};
use bytes::{Buf, Bytes, BytesMut};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

/// Read buffer size
const BUFFER_SIZE: usize = 4 * 1024;

/// Upper bound on a single up-front body reservation
const MAX_BODY_RESERVE: usize = 64 * 1024;

/// Current state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Reading,
    Routing,
    Handling,
    Writing,
    Errored,
    Closed,
}

impl ConnState {
    fn advance(&mut self, next: ConnState) {
        let from = *self;
        trace!(?from, to = ?next, "Connection state");
        *self = next;
    }
}

/// Handle a single client connection.
pub async fn handle_connection(stream: TcpStream, ctx: Arc<Context>) -> Result<(), HttpError> {
    serve_connection(stream, &ctx).await
}

/// Drive one request/response cycle over `stream`, then shut it down.
pub async fn serve_connection<S>(stream: S, ctx: &Context) -> Result<(), HttpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut reader, writer) = tokio::io::split(stream);
    let mut writer = BufWriter::new(writer);
    let mut state = ConnState::Reading;

    let result = exchange(&mut reader, &mut writer, ctx, &mut state).await;
    if result.is_err() {
        state.advance(ConnState::Errored);
    }

    // The stream is dropped (and closed) on return either way
    let shutdown = writer.shutdown().await;
    state.advance(ConnState::Closed);

    result?;
    shutdown?;
    Ok(())
}

async fn exchange<R, W>(
    reader: &mut R,
    writer: &mut W,
    ctx: &Context,
    state: &mut ConnState,
) -> Result<(), HttpError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let request = read_with_deadline(reader, ctx).await?;
    debug!(
        method = %request.method,
        path = %request.path,
        version = %request.version,
        headers = request.headers.len(),
        body_bytes = request.body.len(),
        "Request received"
    );

    state.advance(ConnState::Routing);
    let outcome = match Route::resolve(&request.path) {
        Some(route) => {
            state.advance(ConnState::Handling);
            RouteOutcome::Handled(route.handle(ctx, &request).await)
        }
        None => RouteOutcome::NotFound,
    };
    let response = outcome.into_response();

    state.advance(ConnState::Writing);
    let status = response.status();
    if let Err(e) = response.write_to(writer).await {
        // Part of the response may already be on the wire
        warn!(
            path = %request.path,
            status = status.code(),
            error = %e,
            "Response aborted"
        );
        return Err(e);
    }

    debug!(
        method = %request.method,
        path = %request.path,
        status = status.code(),
        "Response sent"
    );
    Ok(())
}

async fn read_with_deadline<R>(reader: &mut R, ctx: &Context) -> Result<Request, HttpError>
where
    R: AsyncRead + Unpin,
{
    let read = read_request(reader, ctx.max_header_bytes, ctx.max_body_bytes);
    match ctx.read_timeout {
        Some(deadline) => tokio::time::timeout(deadline, read).await.map_err(|_| {
            HttpError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "timed out reading request",
            ))
        })?,
        None => read.await,
    }
}

/// Read and parse one request from `reader`.
///
/// The head may arrive across any number of reads. When `Content-Length` is
/// present exactly that many body bytes are read; bytes past the body are
/// ignored. A declared length above `max_body_bytes` is rejected before any
/// body byte is read.
pub async fn read_request<R>(
    reader: &mut R,
    max_header_bytes: usize,
    max_body_bytes: usize,
) -> Result<Request, HttpError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    let (head, consumed) = loop {
        match parse_head(&buffer) {
            ParseResult::Complete(head, consumed) => break (head, consumed),
            ParseResult::Error(e) => return Err(HttpError::MalformedRequest(e.to_string())),
            ParseResult::Incomplete => {
                if buffer.len() >= max_header_bytes {
                    return Err(head_too_large(max_header_bytes));
                }
                let n = reader.read_buf(&mut buffer).await?;
                if n == 0 {
                    return Err(HttpError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed before end of request head",
                    )));
                }
            }
        }
    };

    if consumed > max_header_bytes {
        return Err(head_too_large(max_header_bytes));
    }
    buffer.advance(consumed);

    let body = match head.headers.content_length() {
        Some(length) if length > max_body_bytes => {
            return Err(HttpError::MalformedRequest(format!(
                "body of {length} bytes exceeds {max_body_bytes} bytes"
            )));
        }
        Some(length) => read_body(reader, buffer, length).await?,
        None => Bytes::new(),
    };

    Ok(Request {
        method: head.method,
        path: head.path,
        version: head.version,
        headers: head.headers,
        body,
    })
}

/// Read exactly `length` body bytes, starting with what is already buffered.
async fn read_body<R>(reader: &mut R, mut buffer: BytesMut, length: usize) -> Result<Bytes, HttpError>
where
    R: AsyncRead + Unpin,
{
    if buffer.len() < length {
        buffer.reserve((length - buffer.len()).min(MAX_BODY_RESERVE));
    }

    while buffer.len() < length {
        let n = reader.read_buf(&mut buffer).await?;
        if n == 0 {
            return Err(HttpError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "connection closed after {} of {} body bytes",
                    buffer.len(),
                    length
                ),
            )));
        }
    }

    buffer.truncate(length);
    Ok(buffer.freeze())
}

fn head_too_large(limit: usize) -> HttpError {
    HttpError::MalformedRequest(format!("request head exceeds {limit} bytes"))
}
