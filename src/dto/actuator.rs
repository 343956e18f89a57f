use crate::domain::{Health, LogExcerpt, Readiness, ServiceInfo};
use crate::dto::ResponseDto;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub health: bool,
}

impl ResponseDto for HealthResponse {
    type Domain = Health;

    fn from_domain(domain: Health) -> Self {
        Self {
            health: domain.healthy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub reason: String,
}

impl ResponseDto for ReadinessResponse {
    type Domain = Readiness;

    fn from_domain(domain: Readiness) -> Self {
        Self {
            ready: domain.ready,
            reason: domain.reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoResponse {
    pub info: ServiceInfo,
}

impl ResponseDto for InfoResponse {
    type Domain = ServiceInfo;

    fn from_domain(domain: ServiceInfo) -> Self {
        Self { info: domain }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: Vec<String>,
}

impl ResponseDto for LogsResponse {
    type Domain = LogExcerpt;

    fn from_domain(domain: LogExcerpt) -> Self {
        Self { logs: domain.lines }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LogsQuery {
    pub log_length: Option<usize>,
}
