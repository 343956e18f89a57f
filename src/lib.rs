//! # Nanoservice
//!
//! A small service scaffold on top of axum: operational endpoints, an echo
//! endpoint, a JSON-RPC bridge exposing routes as MCP tools, and the plumbing
//! around them.
//!
//! ## Features
//!
//! - **Actuators**: `/health`, `/ready`, `/info`, `/logs` and `/metrics`
//! - **Controller registry**: an explicit list of controllers, each built from
//!   the dependency container and registered under a normalized URL prefix
//! - **Configuration**: JSON or TOML files plus environment overrides, held in
//!   an atomically swapped snapshot with a validity flag
//! - **Error taxonomy**: [`exception::ApiError`] maps to a stable JSON body
//! - **Interceptors**: request logging with request ids and Prometheus metrics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nanoservice::config::ConfigService;
//! use nanoservice::Application;
//!
//! #[tokio::main]
//! async fn main() -> nanoservice::Result<()> {
//!     let config = ConfigService::load("config/config.json")?;
//!     let app = Application::builder().config(config).build()?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     app.serve(listener).await
//! }
//! ```

pub mod config;
pub mod controller;
pub mod di;
pub mod domain;
pub mod dto;
pub mod error;
pub mod exception;
pub mod interceptor;
pub mod lifecycle;
pub mod service;
pub mod telemetry;

pub use error::{NanoserviceError, Result};
pub use lifecycle::Application;

pub use async_trait::async_trait;
pub use axum;

/// Prelude module for convenient imports
///
/// ```
/// use nanoservice::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigParameter, ConfigService, Environment};
    pub use crate::controller::{Controller, ControllerRegistry, HttpApp, normalize_prefix};
    pub use crate::di::{Container, ContainerBuilder, Injectable};
    pub use crate::dto::{RequestDto, ResponseDto};
    pub use crate::error::{NanoserviceError, Result};
    pub use crate::exception::{ApiError, ExceptionFilter, HttpExceptionFilter};
    pub use crate::interceptor::{Interceptor, InterceptorResult, Next};
    pub use crate::lifecycle::{Application, ApplicationBuilder, shutdown_signal};
    pub use crate::telemetry::MetricsHandle;
    pub use async_trait::async_trait;
    pub use axum::{
        Json, Router,
        extract::{Path, Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
