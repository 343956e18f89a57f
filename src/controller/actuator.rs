use crate::config::{ConfigParameter, ConfigService};
use crate::controller::{Controller, HttpApp};
use crate::di::{Container, Injectable};
use crate::domain::{Health, Readiness, ServiceInfo};
use crate::dto::{HealthResponse, InfoResponse, LogsQuery, LogsResponse, ReadinessResponse, ResponseDto};
use crate::error::Result;
use crate::exception::ApiError;
use crate::service::logs::{self, DEFAULT_LOG_LENGTH, MAX_LOG_LENGTH};
use crate::telemetry::{MetricsHandle, EXPOSITION_CONTENT_TYPE};
use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strum::IntoEnumIterator;

pub const TAG: &str = "actuators";

const LOG_READ_FAILURE: &str = "Could not read logs.";

/// Operational endpoints: health, readiness, info, logs and metrics.
pub struct ActuatorController {
    config: Arc<ConfigService>,
    metrics: Arc<MetricsHandle>,
    healthy: AtomicBool,
}

impl Injectable for ActuatorController {
    fn inject(container: &Container) -> Result<Self> {
        Ok(Self {
            config: container.resolve()?,
            metrics: container.resolve()?,
            healthy: AtomicBool::new(true),
        })
    }
}

impl ActuatorController {
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    fn health(&self) -> Json<HealthResponse> {
        Json(HealthResponse::from_domain(Health {
            healthy: self.healthy.load(Ordering::Relaxed),
        }))
    }

    fn readiness(&self) -> Response {
        if self.config.is_valid() {
            return Json(ReadinessResponse::from_domain(Readiness::ready())).into_response();
        }

        let reason = self.config.reason();
        tracing::warn!(%reason, "readiness check failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ReadinessResponse::from_domain(Readiness::not_ready(reason))),
        )
            .into_response()
    }

    /// Configuration values grouped into `app`, `logs` and `build`.
    /// Keys that are missing or unreadable are left out.
    fn info(&self) -> Json<InfoResponse> {
        let mut info: ServiceInfo = ["app", "logs", "build"]
            .into_iter()
            .map(|group| (group.to_string(), Default::default()))
            .collect();

        for param in ConfigParameter::iter() {
            if let Ok(Some(value)) = self.config.param(param) {
                let (group, key) = param.group();
                info.entry(group.to_string())
                    .or_default()
                    .insert(key.to_string(), value);
            }
        }

        Json(InfoResponse::from_domain(info))
    }

    async fn logs(
        &self,
        query: std::result::Result<Query<LogsQuery>, QueryRejection>,
    ) -> std::result::Result<Json<LogsResponse>, ApiError> {
        let Query(query) = query?;
        let limit = query.log_length.unwrap_or(DEFAULT_LOG_LENGTH).min(MAX_LOG_LENGTH);
        let path = self.log_file()?;

        let excerpt = tokio::task::spawn_blocking(move || logs::read_excerpt(&path, limit))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "log reader task failed");
                ApiError::internal().with_message(LOG_READ_FAILURE)
            })?
            .map_err(|e| {
                tracing::error!(error = %e, "error retrieving logs");
                ApiError::internal().with_message(LOG_READ_FAILURE)
            })?;

        Ok(Json(LogsResponse::from_domain(excerpt)))
    }

    fn log_file(&self) -> std::result::Result<PathBuf, ApiError> {
        match self.config.param_or::<Option<String>>(ConfigParameter::LogFile, None) {
            Ok(Some(path)) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
            Ok(_) => {
                tracing::error!("error retrieving logs: no log file configured");
                Err(ApiError::internal().with_message(LOG_READ_FAILURE))
            }
            Err(e) => {
                tracing::error!(error = %e, "error retrieving logs");
                Err(ApiError::internal().with_message(LOG_READ_FAILURE))
            }
        }
    }

    fn metrics(&self) -> Response {
        (
            [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
            self.metrics.render(),
        )
            .into_response()
    }
}

impl Controller for ActuatorController {
    fn register_routes(self: Arc<Self>, app: &mut HttpApp, prefix: &str) -> Result<()> {
        let this = self.clone();
        app.get(format!("{prefix}/health"), "Health Check", TAG, move || {
            let this = this.clone();
            async move { this.health() }
        })?;

        let this = self.clone();
        app.get(format!("{prefix}/ready"), "Readiness Probe", TAG, move || {
            let this = this.clone();
            async move { this.readiness() }
        })?;

        let this = self.clone();
        app.get(format!("{prefix}/info"), "Service Information", TAG, move || {
            let this = this.clone();
            async move { this.info() }
        })?;

        let this = self.clone();
        app.get(
            format!("{prefix}/logs"),
            "Service Logs",
            TAG,
            move |query: std::result::Result<Query<LogsQuery>, QueryRejection>| {
                let this = this.clone();
                async move { this.logs(query).await }
            },
        )?;

        let this = self;
        app.get(format!("{prefix}/metrics"), "Prometheus Metrics", TAG, move || {
            let this = this.clone();
            async move { this.metrics() }
        })?;

        Ok(())
    }
}
