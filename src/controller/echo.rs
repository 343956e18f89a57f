use crate::controller::{Controller, HttpApp};
use crate::di::{Container, Injectable};
use crate::dto::{EchoRequest, EchoResponse, RequestDto, ResponseDto};
use crate::error::Result;
use crate::exception::ApiError;
use crate::service::EchoService;
use crate::telemetry;
use axum::extract::rejection::JsonRejection;
use axum::Json;
use std::sync::Arc;

pub const TAG: &str = "echo";

/// `POST /echo`: reflects the request payload with processing timestamps.
pub struct EchoController {
    service: Arc<EchoService>,
}

impl Injectable for EchoController {
    fn inject(container: &Container) -> Result<Self> {
        Ok(Self {
            service: container.resolve()?,
        })
    }
}

impl EchoController {
    fn echo(
        &self,
        payload: std::result::Result<Json<EchoRequest>, JsonRejection>,
    ) -> std::result::Result<Json<EchoResponse>, ApiError> {
        let Json(request) = payload?;
        tracing::info!("Received request for echoing");

        let message = self.service.process(request.to_domain());
        telemetry::record_echo();

        tracing::info!("Echo successfully created");
        Ok(Json(EchoResponse::from_domain(message)))
    }
}

impl Controller for EchoController {
    fn register_routes(self: Arc<Self>, app: &mut HttpApp, prefix: &str) -> Result<()> {
        app.post(
            format!("{prefix}/echo"),
            "Echo Endpoint",
            TAG,
            move |payload: std::result::Result<Json<EchoRequest>, JsonRejection>| {
                let this = self.clone();
                async move { this.echo(payload) }
            },
        )?;
        Ok(())
    }
}
