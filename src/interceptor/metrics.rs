use crate::interceptor::{Interceptor, InterceptorResult, Next};
use crate::telemetry;
use async_trait::async_trait;
use axum::{body::Body, extract::MatchedPath, http::Request};
use std::time::Instant;

/// Counts and times requests per route template.
#[derive(Clone, Default)]
pub struct MetricsInterceptor;

#[async_trait]
impl Interceptor for MetricsInterceptor {
    async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
        let method = request.method().as_str().to_string();
        let path = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| "unmatched".to_string());
        let start = Instant::now();

        let result = next.run(request).await;
        // Errors become a 500 in the exception filter.
        let status = result.as_ref().map_or(500, |r| r.status().as_u16());
        telemetry::record_request(&method, &path, status, start.elapsed());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::InterceptorLayer;
    use crate::telemetry::MetricsHandle;
    use axum::routing::get;
    use axum::Router;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[test]
    fn test_records_route_template() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = MetricsHandle::from_handle(recorder.handle());
        let router = Router::new()
            .route("/items/{id}", get(|| async { "item" }))
            .layer(InterceptorLayer::new(vec![Arc::new(MetricsInterceptor)]));

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                router
                    .oneshot(Request::get("/items/42").body(Body::empty()).unwrap())
                    .await
                    .unwrap();
            })
        });

        let text = handle.render();
        assert!(text.contains(r#"path="/items/{id}""#), "{text}");
        assert!(!text.contains("/items/42"), "{text}");
    }
}
