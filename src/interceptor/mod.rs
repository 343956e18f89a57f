use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use std::future::Future;
use std::pin::Pin;

mod layer;
mod logging;
mod metrics;

pub use layer::{InterceptorLayer, InterceptorMiddleware};
pub use logging::{LoggingInterceptor, RequestId, REQUEST_ID_HEADER};
pub use metrics::MetricsInterceptor;

/// Standard return type for interceptors.
///
/// An `Err` is handed to the layer's exception filter.
pub type InterceptorResult = Result<Response, anyhow::Error>;

type BoxedChain =
    Box<dyn FnOnce(Request<Body>) -> Pin<Box<dyn Future<Output = InterceptorResult> + Send>> + Send>;

/// The rest of the chain after the current interceptor.
pub struct Next {
    run: BoxedChain,
}

impl Next {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Request<Body>) -> Pin<Box<dyn Future<Output = InterceptorResult> + Send>>
            + Send
            + 'static,
    {
        Self { run: Box::new(f) }
    }

    pub async fn run(self, request: Request<Body>) -> InterceptorResult {
        (self.run)(request).await
    }
}

/// Runs around every request: may inspect or modify the request before the
/// handler and the response after it.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use axum::{body::Body, http::Request};
/// use nanoservice::interceptor::{Interceptor, InterceptorResult, Next};
///
/// struct Timing;
///
/// #[async_trait]
/// impl Interceptor for Timing {
///     async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
///         let start = std::time::Instant::now();
///         let response = next.run(request).await?;
///         tracing::debug!(elapsed = ?start.elapsed(), "handled");
///         Ok(response)
///     }
/// }
/// ```
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult;
}
