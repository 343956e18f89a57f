use crate::interceptor::{Interceptor, InterceptorResult, Next};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderValue, Request},
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request identifier, available to handlers through request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Logs every request and its outcome under a request id.
///
/// An incoming `x-request-id` header is reused; otherwise a fresh v4 UUID is
/// generated. The id is echoed back in the response header.
#[derive(Clone, Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    async fn intercept(&self, mut request: Request<Body>, next: Next) -> InterceptorResult {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        request.extensions_mut().insert(RequestId(request_id.clone()));

        let method = request.method().clone();
        let uri = request.uri().clone();
        let span = tracing::info_span!("request", id = %request_id, %method, %uri);

        async move {
            let start = Instant::now();
            tracing::debug!("--> {} {}", method, uri);

            match next.run(request).await {
                Ok(mut response) => {
                    let status = response.status();
                    tracing::info!(
                        status = status.as_u16(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "<-- {} {}",
                        method,
                        uri
                    );
                    if let Ok(value) = HeaderValue::from_str(&request_id) {
                        response.headers_mut().insert(REQUEST_ID_HEADER, value);
                    }
                    Ok(response)
                }
                Err(e) => {
                    tracing::warn!(
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "<-- {} {} failed: {}",
                        method,
                        uri,
                        e
                    );
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}
