use super::shutdown_signal;
use crate::config::{ConfigParameter, ConfigService, Environment};
use crate::controller::{
    mcp, normalize_prefix, ControllerRegistry, HttpApp, RouteInfo, RouteTable, ToolDispatcher,
};
use crate::di::{Container, ContainerBuilder};
use crate::error::{NanoserviceError, Result};
use crate::exception::ApiError;
use crate::interceptor::{Interceptor, InterceptorLayer, LoggingInterceptor, MetricsInterceptor};
use crate::service::EchoService;
use crate::telemetry::MetricsHandle;
use axum::response::Response;
use axum::Router;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;

/// A fully wired service: every controller registered under the URL prefix,
/// wrapped in the interceptor chain.
///
/// # Example
///
/// ```rust,no_run
/// use nanoservice::config::ConfigService;
/// use nanoservice::lifecycle::Application;
///
/// # async fn run() -> nanoservice::Result<()> {
/// let app = Application::builder()
///     .config(ConfigService::load("config/config.json")?)
///     .build()?;
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// app.serve(listener).await
/// # }
/// ```
pub struct Application {
    router: Router,
    routes: RouteTable,
    prefix: String,
    environment: Environment,
    container: Arc<Container>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// A clone of the composed router, handy for driving requests in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }

    /// Registered routes, sorted by path then method.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.routes.sorted()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Serve until Ctrl+C or SIGTERM, then drain in-flight requests.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(%addr, prefix = %self.prefix, environment = %self.environment, "listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signal)
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Builder for [`Application`].
pub struct ApplicationBuilder {
    config: Option<Arc<ConfigService>>,
    registry: ControllerRegistry,
    metrics: Option<MetricsHandle>,
    container: ContainerBuilder,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationBuilder {
    /// Starts with the built-in controllers and the logging and metrics
    /// interceptors.
    pub fn new() -> Self {
        Self {
            config: None,
            registry: ControllerRegistry::builtin(),
            metrics: None,
            container: ContainerBuilder::new(),
            interceptors: vec![Arc::new(LoggingInterceptor), Arc::new(MetricsInterceptor)],
        }
    }

    pub fn config(self, config: ConfigService) -> Self {
        self.shared_config(Arc::new(config))
    }

    /// Use a config service shared with the caller, e.g. to invalidate it later.
    pub fn shared_config(mut self, config: Arc<ConfigService>) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the controller list.
    pub fn controllers(mut self, registry: ControllerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Metrics handle backing `/metrics`; a detached one is used when unset.
    pub fn metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Make an extra dependency available to controllers.
    pub fn provide<T: 'static + Send + Sync>(mut self, instance: T) -> Self {
        self.container = self.container.register(instance);
        self
    }

    /// Append an interceptor; it runs inside the ones already added.
    pub fn interceptor(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Wire the container, register all controllers and compose the router.
    ///
    /// # Errors
    ///
    /// Fails when no config was supplied or a controller cannot be
    /// constructed or registered. Nothing is served in that case.
    pub fn build(self) -> Result<Application> {
        let config = self.config.ok_or(NanoserviceError::MissingConfig)?;

        tracing::info!("Starting application initialization...");

        let environment = config.environment().unwrap_or_else(|e| {
            tracing::warn!("Could not read environment, assuming development: {}", e);
            Environment::default()
        });
        let raw_prefix: String = config
            .param_or(ConfigParameter::AppUrlPrefix, String::new())
            .unwrap_or_else(|e| {
                tracing::warn!("Could not read URL prefix, serving at the root: {}", e);
                String::new()
            });
        let prefix = normalize_prefix(&raw_prefix);

        let dispatcher = Arc::new(ToolDispatcher::new());
        let container = self
            .container
            .register_arc(config)
            .register(self.metrics.unwrap_or_else(MetricsHandle::detached))
            .register_arc(dispatcher.clone())
            .register_default(EchoService::new)
            .build();

        let mut app = HttpApp::new();
        self.registry.register_all(&container, &mut app, &prefix)?;

        // MCP tools call every other route in-process.
        dispatcher.attach(app.build_router(|route| route.tag != mcp::TAG));

        let (router, routes) = app.into_router();
        let router = router
            .fallback(|| async { ApiError::not_found() })
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(InterceptorLayer::new(self.interceptors));

        tracing::info!(
            controllers = ?self.registry.names(),
            routes = routes.snapshot().len(),
            "Application initialization complete"
        );

        Ok(Application {
            router,
            routes,
            prefix,
            environment,
            container: Arc::new(container),
        })
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!("Handler panicked: {}", detail);
    ApiError::internal().render()
}
