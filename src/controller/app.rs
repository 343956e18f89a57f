use crate::error::{NanoserviceError, Result};
use arc_swap::ArcSwap;
use axum::handler::Handler;
use axum::http::Method;
use axum::routing::{self, MethodRouter};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;

/// One registered route as seen by introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
    pub summary: String,
    pub tag: String,
}

impl RouteInfo {
    pub fn new(method: Method, path: impl Into<String>, summary: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            method: method.as_str().to_string(),
            path: path.into(),
            summary: summary.into(),
            tag: tag.into(),
        }
    }
}

/// Read-only view of the composed application's routes.
///
/// Cloned into controllers at registration time and filled in once the
/// application is built, so handlers read the final table lazily.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Arc<ArcSwap<Vec<RouteInfo>>>,
}

impl RouteTable {
    pub fn snapshot(&self) -> Arc<Vec<RouteInfo>> {
        self.routes.load_full()
    }

    /// Routes ordered by path, then method.
    pub fn sorted(&self) -> Vec<RouteInfo> {
        let mut routes = self.snapshot().as_ref().clone();
        routes.sort_by(|a, b| (&a.path, &a.method).cmp(&(&b.path, &b.method)));
        routes
    }

    fn publish(&self, routes: Vec<RouteInfo>) {
        self.routes.store(Arc::new(routes));
    }
}

/// The application object controllers register onto.
///
/// Wraps route registration so every route is validated and recorded
/// before it reaches the `axum::Router`. Paths are checked against the same
/// matcher axum uses, so building the router afterwards cannot panic.
#[derive(Default)]
pub struct HttpApp {
    routes: Vec<(RouteInfo, MethodRouter)>,
    matcher: matchit::Router<()>,
    table: RouteTable,
}

impl HttpApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route_table(&self) -> RouteTable {
        self.table.clone()
    }

    pub fn routes(&self) -> impl Iterator<Item = &RouteInfo> {
        self.routes.iter().map(|(info, _)| info)
    }

    pub fn add(&mut self, info: RouteInfo, handler: MethodRouter) -> Result<&mut Self> {
        validate_path(&info.path)?;

        let mut known_path = false;
        for existing in self.routes() {
            if existing.path == info.path {
                if existing.method == info.method {
                    return Err(NanoserviceError::DuplicateRoute {
                        method: info.method,
                        path: info.path,
                    });
                }
                known_path = true;
            }
        }
        // Another method on a known path merges into the same matcher entry.
        if !known_path {
            self.matcher
                .insert(info.path.clone(), ())
                .map_err(|e| match e {
                    matchit::InsertError::Conflict { with } => NanoserviceError::ConflictingRoute {
                        path: info.path.clone(),
                        existing: with,
                    },
                    other => NanoserviceError::InvalidRoute {
                        path: info.path.clone(),
                        reason: other.to_string(),
                    },
                })?;
        }

        tracing::debug!(method = %info.method, path = %info.path, "route registered");
        self.routes.push((info, handler));
        Ok(self)
    }

    pub fn get<H, T>(
        &mut self,
        path: impl Into<String>,
        summary: &str,
        tag: &str,
        handler: H,
    ) -> Result<&mut Self>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(RouteInfo::new(Method::GET, path, summary, tag), routing::get(handler))
    }

    pub fn post<H, T>(
        &mut self,
        path: impl Into<String>,
        summary: &str,
        tag: &str,
        handler: H,
    ) -> Result<&mut Self>
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(RouteInfo::new(Method::POST, path, summary, tag), routing::post(handler))
    }

    /// A router over the routes accepted by `filter`, leaving the table untouched.
    pub fn build_router(&self, filter: impl Fn(&RouteInfo) -> bool) -> Router {
        self.routes
            .iter()
            .filter(|(info, _)| filter(info))
            .fold(Router::new(), |router, (info, handler)| {
                router.route(&info.path, handler.clone())
            })
    }

    /// Freeze the route table and produce the final router.
    pub fn into_router(self) -> (Router, RouteTable) {
        let router = self.build_router(|_| true);
        let infos = self.routes.into_iter().map(|(info, _)| info).collect();
        self.table.publish(infos);
        (router, self.table)
    }
}

fn validate_path(path: &str) -> Result<()> {
    let invalid = |reason: &str| NanoserviceError::InvalidRoute {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    if !path.starts_with('/') {
        return Err(invalid("paths must start with '/'"));
    }
    if path
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err(invalid("captures use the `{name}` and `{*rest}` syntax"));
    }

    // `{{` and `}}` are escaped literals.
    let mut open = false;
    for c in path.replace("{{", "").replace("}}", "").chars() {
        match c {
            '{' if !open => open = true,
            '}' if open => open = false,
            '{' | '}' => return Err(invalid("unbalanced braces")),
            _ => {}
        }
    }
    if open {
        return Err(invalid("unbalanced braces"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_rejects_relative_path() {
        let mut app = HttpApp::new();
        let err = app.get("health", "Health", "actuators", || async { "ok" }).err();
        assert!(matches!(err, Some(NanoserviceError::InvalidRoute { .. })));
    }

    #[test]
    fn test_rejects_duplicate_route() {
        let mut app = HttpApp::new();
        app.get("/health", "Health", "actuators", || async { "ok" })
            .unwrap();
        let err = app.get("/health", "Again", "actuators", || async { "ok" }).err();
        assert!(matches!(err, Some(NanoserviceError::DuplicateRoute { .. })));
    }

    #[test]
    fn test_rejects_conflicting_captures() {
        let mut app = HttpApp::new();
        app.get("/items/{id}", "By id", "items", || async { "id" })
            .unwrap();
        let err = app
            .get("/items/{name}", "By name", "items", || async { "name" })
            .err();
        match err {
            Some(NanoserviceError::ConflictingRoute { path, existing }) => {
                assert_eq!(path, "/items/{name}");
                assert_eq!(existing, "/items/{id}");
            }
            other => panic!("unexpected: {other:?}"),
        }
        // The rejected route never reaches the router.
        let (_, table) = app.into_router();
        assert_eq!(table.snapshot().len(), 1);
    }

    #[test]
    fn test_rejects_malformed_patterns() {
        let mut app = HttpApp::new();
        for path in ["/items/:id", "/files/*rest", "/items/{id"] {
            let err = app.get(path, "Bad", "items", || async { "" }).err();
            assert!(
                matches!(err, Some(NanoserviceError::InvalidRoute { .. })),
                "{path}: {err:?}"
            );
        }
        assert_eq!(app.routes().count(), 0);
    }

    #[tokio::test]
    async fn test_same_path_different_methods_merge() {
        let mut app = HttpApp::new();
        app.get("/item", "Read", "items", || async { "read" })
            .unwrap()
            .post("/item", "Write", "items", || async { "write" })
            .unwrap();
        let (router, table) = app.into_router();

        assert_eq!(table.snapshot().len(), 2);
        let response = router
            .clone()
            .oneshot(Request::post("/item").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let response = router
            .oneshot(Request::get("/item").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_table_is_published_on_build() {
        let mut app = HttpApp::new();
        let table = app.route_table();
        app.get("/b", "B", "t", || async { "b" })
            .unwrap()
            .get("/a", "A", "t", || async { "a" })
            .unwrap();
        assert!(table.snapshot().is_empty());

        let _ = app.into_router();
        let paths: Vec<String> = table.sorted().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }
}
