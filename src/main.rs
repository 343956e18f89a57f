use anyhow::Context;
use nanoservice::config::{logging, ConfigParameter, ConfigService};
use nanoservice::service::logs::STARTUP_MESSAGE;
use nanoservice::telemetry::MetricsHandle;
use nanoservice::Application;
use std::sync::Arc;
use tokio::net::TcpListener;

const CONFIG_PATH_VAR: &str = "APP_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/config.json";
const DEFAULT_PORT: u16 = 8080;

fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    // A config that fails to load still lets the service start; /ready reports why.
    let config = Arc::new(ConfigService::new());
    let load_error = config.reload(&config_path).err();
    if let Some(e) = &load_error {
        config.invalidate(e.to_string());
    }

    if let Some(handle) = logging::init_or_fallback(&config.logging_config()) {
        config.attach_logging(handle);
    }
    if let Some(e) = load_error {
        tracing::error!(path = %config_path, "Configuration could not be loaded: {}", e);
    }

    let environment = config.environment().unwrap_or_default();
    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all();
    if environment.is_production() {
        runtime.worker_threads(2 * num_cpus::get() + 1);
    }
    let runtime = runtime.build().context("failed to build tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: Arc<ConfigService>) -> anyhow::Result<()> {
    let metrics = MetricsHandle::install().unwrap_or_else(|e| {
        tracing::warn!("Prometheus recorder not installed, /metrics stays empty: {}", e);
        MetricsHandle::detached()
    });

    let port = config
        .param_or(ConfigParameter::AppPort, DEFAULT_PORT)
        .unwrap_or(DEFAULT_PORT);

    let app = Application::builder()
        .shared_config(config)
        .metrics(metrics)
        .build()
        .context("failed to build application")?;

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;

    tracing::info!("{} on port {}", STARTUP_MESSAGE, port);
    app.serve(listener).await?;
    Ok(())
}
