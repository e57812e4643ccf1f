//! Route handlers.
//!
//! Each handler turns a `Request` into a `Response`. Failures that have a
//! status code are returned as `HttpError::NotFound`/`HttpError::Internal`
//! and mapped by the router.

use super::request::{Request, CONTENT_LENGTH};
use super::response::Response;
use super::router::Route;
use super::{Context, HttpError};
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};
use tracing::{debug, warn};

/// `/`: empty `200 OK`.
pub fn root() -> Response {
    Response::ok()
}

/// `/echo/<value>`: reflect `<value>` as plain text.
///
/// When `Accept-Encoding` is exactly `gzip` the response advertises
/// `Content-Encoding: gzip`, but the body is sent uncompressed. Clients
/// that honor the header will fail to decode it.
pub fn echo(request: &Request) -> Response {
    let value = route_argument(&request.path, Route::Echo.prefix());
    let response = Response::text(value.to_string());

    if request.header("Accept-Encoding") == Some("gzip") {
        response.header("Content-Encoding", "gzip")
    } else {
        response
    }
}

/// `/user-agent`: reflect the `User-Agent` header (empty if absent).
pub fn user_agent(request: &Request) -> Response {
    let agent = request.header("User-Agent").unwrap_or_default();
    Response::text(agent.to_string())
}

/// `/files/<name>`: write when the request carries `Content-Length`,
/// otherwise read.
pub async fn files(ctx: &Context, request: &Request) -> Result<Response, HttpError> {
    let name = route_argument(&request.path, Route::Files.prefix());
    let is_write = request.has_header(CONTENT_LENGTH);

    let directory = match ctx.directory.as_deref() {
        Some(dir) => dir,
        None if is_write => {
            return Err(HttpError::Internal(
                "no files directory configured".to_string(),
            ))
        }
        None => {
            warn!(path = %request.path, "File read with no files directory configured");
            return Err(HttpError::NotFound);
        }
    };

    let path = resolve_file_path(directory, name)?;

    if is_write {
        write_file(&path, request).await
    } else {
        read_file(&path).await
    }
}

async fn write_file(path: &Path, request: &Request) -> Result<Response, HttpError> {
    fs::write(path, &request.body).await.map_err(|e| {
        HttpError::Internal(format!("failed to write '{}': {}", path.display(), e))
    })?;

    debug!(path = %path.display(), bytes = request.body.len(), "File written");
    Ok(Response::created())
}

async fn read_file(path: &Path) -> Result<Response, HttpError> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(HttpError::NotFound),
        Err(e) => {
            return Err(HttpError::Internal(format!(
                "failed to open '{}': {}",
                path.display(),
                e
            )))
        }
    };

    let metadata = file.metadata().await.map_err(|e| {
        HttpError::Internal(format!("failed to stat '{}': {}", path.display(), e))
    })?;
    if !metadata.is_file() {
        return Err(HttpError::NotFound);
    }

    Ok(Response::file(file, metadata.len()))
}

/// Join `name` onto `directory`, refusing anything that could leave it.
///
/// Only plain path segments are accepted; `..`, `.`, absolute paths and the
/// empty name all resolve to `NotFound`.
fn resolve_file_path(directory: &Path, name: &str) -> Result<PathBuf, HttpError> {
    let relative = Path::new(name);
    let mut components = relative.components().peekable();

    if components.peek().is_none() {
        return Err(HttpError::NotFound);
    }
    if !components.all(|c| matches!(c, Component::Normal(_))) {
        warn!(name, "Rejected file name escaping the files directory");
        return Err(HttpError::NotFound);
    }

    Ok(directory.join(relative))
}

/// Text after `prefix` and the `/` that follows it.
fn route_argument<'a>(path: &'a str, prefix: &str) -> &'a str {
    let rest = path.strip_prefix(prefix).unwrap_or_default();
    rest.strip_prefix('/').unwrap_or(rest)
}
