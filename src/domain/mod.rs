//! Transport-agnostic business data.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Arbitrary structured payload carried through the echo round trip.
pub type Payload = Map<String, Value>;

/// What the echo service is asked to process.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EchoInput {
    pub data: Payload,
    pub metadata: Option<Payload>,
}

/// A processed echo.
///
/// `processed_timestamp` is never earlier than `service_start_time`, and
/// `data` is exactly what the caller sent.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoMessage {
    pub data: Payload,
    pub metadata: Payload,
    pub processed_timestamp: DateTime<Utc>,
    pub service_start_time: DateTime<Utc>,
    pub is_processed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    pub healthy: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    pub ready: bool,
    pub reason: String,
}

impl Readiness {
    pub fn ready() -> Self {
        Self {
            ready: true,
            reason: String::new(),
        }
    }

    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            ready: false,
            reason: reason.into(),
        }
    }
}

/// Configuration values grouped as `group -> short key -> value`.
pub type ServiceInfo = BTreeMap<String, BTreeMap<String, Value>>;

/// The newest log lines first, with restart markers inserted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogExcerpt {
    pub lines: Vec<String>,
}
