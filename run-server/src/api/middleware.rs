//! Request Pipeline
//!
//! Cross-cutting behavior wrapped around every handler: a correlation ID per
//! request and one access log line per request.
//!
//! Middlewares are plain functions so they can be listed and composed in
//! the order they should see the request:
//!
//! ```text
//! compose(router, &[A, B])
//!
//!   request ──▶ A pre ──▶ B pre ──▶ handler ──▶ B post ──▶ A post ──▶ response
//! ```

use axum::{
    Json, Router,
    extract::{FromRequestParts, Request},
    http::{Extensions, HeaderValue, StatusCode, request::Parts},
    middleware::{Next, from_fn},
    response::{IntoResponse, Response},
};
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, info_span};

/// Header echoing the correlation ID back to the client
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A middleware step of the request pipeline
pub type Middleware = fn(Request, Next) -> BoxFuture<'static, Response>;

/// Default pipeline: correlation ID first, so the access log can use it
pub const REQUEST_PIPELINE: [Middleware; 2] = [assign_correlation_id, log_access];

/// Wraps `router` with `middlewares`, the first one listed being outermost
pub fn compose<S>(router: Router<S>, middlewares: &[Middleware]) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // Each layer wraps everything added before it, so the list is applied
    // back to front for the first middleware to end up outermost.
    middlewares
        .iter()
        .rev()
        .fold(router, |router, middleware| router.layer(from_fn(*middleware)))
}

// =============================================================================
// Correlation ID
// =============================================================================

/// Per-request token tying log lines of one request together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Generates a fresh random ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads the ID assigned to a request
    pub fn from_extensions(extensions: &Extensions) -> Result<&Self, MissingCorrelationId> {
        extensions.get::<Self>().ok_or(MissingCorrelationId)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = MissingCorrelationId;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_extensions(&parts.extensions).cloned()
    }
}

/// The request went through a step needing a correlation ID before one was assigned
///
/// This is a wiring bug, not something a client can cause.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("request has no correlation ID")]
pub struct MissingCorrelationId;

impl IntoResponse for MissingCorrelationId {
    fn into_response(self) -> Response {
        error!("{}: assign_correlation_id must run first", self);
        internal_error("Internal server error")
    }
}

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

// =============================================================================
// Middlewares
// =============================================================================

/// Tags the request with a fresh correlation ID
///
/// The rest of the pipeline runs inside a span carrying the ID, and the ID
/// is echoed in the `x-request-id` response header. A request that already
/// has an ID is refused.
pub fn assign_correlation_id(mut req: Request, next: Next) -> BoxFuture<'static, Response> {
    async move {
        if let Ok(existing) = CorrelationId::from_extensions(req.extensions()) {
            error!(request_id = %existing, "correlation ID assigned twice");
            return internal_error("Internal server error");
        }

        let id = CorrelationId::generate();
        req.extensions_mut().insert(id.clone());

        let span = info_span!("request", request_id = %id);
        span.in_scope(|| debug!("setting request ID"));

        let mut response = next.run(req).instrument(span).await;

        if let Ok(value) = HeaderValue::from_str(id.as_str()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }

        response
    }
    .boxed()
}

/// Emits one access log line per request
pub fn log_access(req: Request, next: Next) -> BoxFuture<'static, Response> {
    async move {
        let request_id = match CorrelationId::from_extensions(req.extensions()) {
            Ok(id) => id.clone(),
            Err(missing) => return missing.into_response(),
        };

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let started = Instant::now();

        let response = next.run(req).await;

        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "{} {}",
            method,
            path
        );

        response
    }
    .boxed()
}
