//! Fixed-prefix request router.

use super::request::Request;
use super::response::Response;
use super::routes;
use super::{Context, HttpError};
use tracing::warn;

/// A handler bound to a path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Echo,
    UserAgent,
    Files,
}

/// Prefix routes in priority order. `/` is matched exactly before these.
const PREFIX_ROUTES: [(&str, Route); 3] = [
    ("/echo", Route::Echo),
    ("/user-agent", Route::UserAgent),
    ("/files", Route::Files),
];

/// Outcome of routing a request.
#[derive(Debug)]
pub enum RouteOutcome {
    Handled(Response),
    NotFound,
}

impl RouteOutcome {
    pub fn into_response(self) -> Response {
        match self {
            RouteOutcome::Handled(response) => response,
            RouteOutcome::NotFound => Response::not_found(),
        }
    }
}

impl Route {
    /// Select the route for `path`.
    ///
    /// A prefix matches the whole path or a leading run of path segments, so
    /// `/echo/abc` routes to echo while `/echoes` does not.
    pub fn resolve(path: &str) -> Option<Route> {
        if path == "/" {
            return Some(Route::Root);
        }

        PREFIX_ROUTES
            .iter()
            .find(|(prefix, _)| matches_prefix(path, prefix))
            .map(|(_, route)| *route)
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Echo => "/echo",
            Route::UserAgent => "/user-agent",
            Route::Files => "/files",
        }
    }

    /// Run the handler and map its errors onto status responses.
    pub async fn handle(self, ctx: &Context, request: &Request) -> Response {
        let result = match self {
            Route::Root => Ok(routes::root()),
            Route::Echo => Ok(routes::echo(request)),
            Route::UserAgent => Ok(routes::user_agent(request)),
            Route::Files => routes::files(ctx, request).await,
        };

        match result {
            Ok(response) => response,
            Err(HttpError::NotFound) => Response::not_found(),
            Err(e) => {
                warn!(route = ?self, path = %request.path, error = %e, "Handler failed");
                Response::internal_error()
            }
        }
    }
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
