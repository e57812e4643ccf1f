//! HTTP/1.1 request handling.
//!
//! A deliberately narrow subset of the protocol: one request per connection,
//! `Content-Length` framed bodies only, and four fixed routes.
//!
//! ## Pipeline
//!
//! ```text
//! connection -> parser -> Request -> router -> routes -> Response -> writer -> close
//! ```
//!
//! ## Routes
//!
//! | Path            | Behavior                                            |
//! |-----------------|-----------------------------------------------------|
//! | `/`             | `200 OK`, empty                                     |
//! | `/echo/<text>`  | `200` text/plain echo of `<text>`                   |
//! | `/user-agent`   | `200` text/plain echo of the `User-Agent` header    |
//! | `/files/<name>` | write with `Content-Length` (201), otherwise read   |
//! | anything else   | `404 Not Found`                                     |

pub mod connection;
pub mod error;
pub mod parser;
pub mod request;
pub mod response;
pub mod router;
pub mod routes;

pub use connection::handle_connection;
pub use error::HttpError;

use crate::config::{default_max_body_bytes, default_max_header_bytes, Config};
use std::path::PathBuf;
use std::time::Duration;

/// Read-only state shared by every connection task.
#[derive(Debug, Clone)]
pub struct Context {
    /// Root for the `/files` routes.
    pub directory: Option<PathBuf>,
    /// Upper bound on start line plus headers.
    pub max_header_bytes: usize,
    /// Upper bound on a declared `Content-Length`.
    pub max_body_bytes: usize,
    /// Deadline for reading the full request.
    pub read_timeout: Option<Duration>,
}

impl Context {
    pub fn new(directory: Option<PathBuf>) -> Self {
        Self {
            directory,
            max_header_bytes: default_max_header_bytes(),
            max_body_bytes: default_max_body_bytes(),
            read_timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            max_header_bytes: config.max_header_bytes,
            max_body_bytes: config.max_body_bytes,
            read_timeout: config.read_timeout,
            ..Self::new(config.directory.clone())
        }
    }
}
