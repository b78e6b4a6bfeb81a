//! Runtime support for generated route files.
//!
//! Generated code only names items of this module, so the module path can be swapped with the
//! `runtime=` plugin parameter when a project wants to wrap it.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{error, warn};

mod bind;
mod registry;

pub use axum::Router;
pub use axum::extract::Request;
pub use axum::middleware::Next;
pub use axum::response::Response;
pub use axum::routing::{MethodFilter, MethodRouter, on};

pub use bind::{BindError, Binding, Context, FieldSource, Source, bind};
pub use registry::ServiceRegistry;

/// Error type of service implementations. Answered with 500.
pub type Error = anyhow::Error;

/// Response of methods marked `dynamic_resp:"true"`.
pub type DynamicResponse = serde_json::Value;

/// 200 with `value` as JSON.
pub fn success<T: Serialize>(value: T) -> Response {
    Json(value).into_response()
}

/// 400 `{"error": "..."}` for a request that could not be bound.
pub fn client_error(err: BindError) -> Response {
    warn!(error = %err, "request rejected");
    error_response(StatusCode::BAD_REQUEST, err.to_string())
}

/// 500 `{"error": "..."}` for a failed service call.
pub fn server_error(err: Error) -> Response {
    let message = format!("{err:#}");
    error!(error = %message, "service call failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

type MiddlewareFn = dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync;

/// A middleware passed to a generated `register_*` function. Applied to every route whose
/// method lists it in its `midware` tag.
#[derive(Clone)]
pub struct Middleware(Arc<MiddlewareFn>);

impl Middleware {
    /// Middleware from an async function, the same shape `axum::middleware::from_fn` takes.
    ///
    /// ```
    /// use protoroute::rt::{Middleware, Next, Request};
    ///
    /// let audit = Middleware::from_fn(|request: Request, next: Next| async move {
    ///     let path = request.uri().path().to_string();
    ///     let response = next.run(request).await;
    ///     tracing::info!(%path, status = %response.status(), "audited");
    ///     response
    /// });
    /// # let _ = audit;
    /// ```
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Middleware(Arc::new(
            move |request: Request, next: Next| -> BoxFuture<'static, Response> {
                Box::pin(f(request, next))
            },
        ))
    }

    /// Passes every request through unchanged.
    pub fn identity() -> Self {
        Self::from_fn(|request: Request, next: Next| next.run(request))
    }

    /// Wrap `route`. Wrapping `a.apply(b.apply(route))` runs `a` first.
    pub fn apply(&self, route: MethodRouter) -> MethodRouter {
        let middleware = self.clone();
        route.layer(axum::middleware::from_fn(move |request: Request, next: Next| {
            (middleware.0)(request, next)
        }))
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}
