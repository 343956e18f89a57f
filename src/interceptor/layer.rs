use crate::exception::{ExceptionFilter, HttpExceptionFilter};
use crate::interceptor::{Interceptor, InterceptorResult, Next};
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

type BoxedFuture = Pin<Box<dyn Future<Output = InterceptorResult> + Send>>;

/// Tower layer running a chain of interceptors around the inner service.
///
/// Interceptors run in the order given; the first one wraps all the others.
/// An error escaping the chain is turned into a response by the exception
/// filter, so the resulting service never fails.
#[derive(Clone)]
pub struct InterceptorLayer {
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
    filter: Arc<dyn ExceptionFilter>,
}

impl InterceptorLayer {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            interceptors: Arc::new(interceptors),
            filter: Arc::new(HttpExceptionFilter),
        }
    }

    pub fn with_filter(mut self, filter: impl ExceptionFilter) -> Self {
        self.filter = Arc::new(filter);
        self
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = InterceptorMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptorMiddleware {
            inner,
            interceptors: self.interceptors.clone(),
            filter: self.filter.clone(),
        }
    }
}

#[derive(Clone)]
pub struct InterceptorMiddleware<S> {
    inner: S,
    interceptors: Arc<Vec<Arc<dyn Interceptor>>>,
    filter: Arc<dyn ExceptionFilter>,
}

impl<S> Service<Request<Body>> for InterceptorMiddleware<S>
where
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let interceptors = self.interceptors.clone();
        let filter = self.filter.clone();
        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let mut chain = Next::new(move |req: Request<Body>| -> BoxedFuture {
                Box::pin(async move {
                    match inner.call(req).await {
                        Ok(response) => Ok(response.into_response()),
                        Err(never) => match never {},
                    }
                })
            });

            // interceptors[0] wraps (interceptors[1] wraps ... (inner))
            for i in (0..interceptors.len()).rev() {
                let interceptors = interceptors.clone();
                let next = chain;
                chain = Next::new(move |req: Request<Body>| -> BoxedFuture {
                    Box::pin(async move { interceptors[i].intercept(req, next).await })
                });
            }

            Ok(match chain.run(request).await {
                Ok(response) => response,
                Err(error) => filter.catch(error),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ApiError;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Interceptor for Record {
        async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
            self.log.lock().unwrap().push(format!("before {}", self.name));
            let response = next.run(request).await?;
            self.log.lock().unwrap().push(format!("after {}", self.name));
            Ok(response)
        }
    }

    struct Reject;

    #[async_trait]
    impl Interceptor for Reject {
        async fn intercept(&self, request: Request<Body>, next: Next) -> InterceptorResult {
            match request.headers().get("x-token") {
                Some(token) if token.as_bytes() == b"secret" => next.run(request).await,
                Some(_) => Err(anyhow::anyhow!("token lookup failed for backend 10.0.0.7")),
                None => Err(ApiError::unauthorized().into()),
            }
        }
    }

    fn request(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::get("/");
        if let Some(token) = token {
            builder = builder.header("x-token", token);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_chain_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let layer = InterceptorLayer::new(vec![
            Arc::new(Record { name: "outer", log: log.clone() }),
            Arc::new(Record { name: "inner", log: log.clone() }),
        ]);
        let router = Router::new().route("/", get(|| async { "ok" })).layer(layer);

        let response = router.oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before outer", "before inner", "after inner", "after outer"]
        );
    }

    #[tokio::test]
    async fn test_errors_go_through_filter() {
        let router = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(InterceptorLayer::new(vec![Arc::new(Reject)]));

        let response = router.clone().oneshot(request(Some("secret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router.clone().oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router.oneshot(request(Some("wrong"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(!String::from_utf8_lossy(&body).contains("10.0.0.7"));
    }
}
