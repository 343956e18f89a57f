use crate::domain::{EchoInput, EchoMessage, Payload};
use crate::dto::{RequestDto, ResponseDto};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /echo`: any JSON object plus optional metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EchoRequest {
    #[serde(default)]
    pub data: Payload,
    #[serde(default)]
    pub metadata: Option<Payload>,
}

impl RequestDto for EchoRequest {
    type Domain = EchoInput;

    fn to_domain(self) -> EchoInput {
        EchoInput {
            data: self.data,
            metadata: self.metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EchoResponse {
    pub input_data: Payload,
    pub processed: bool,
    pub processed_timestamp: DateTime<Utc>,
    pub up_timestamp: DateTime<Utc>,
}

impl ResponseDto for EchoResponse {
    type Domain = EchoMessage;

    fn from_domain(domain: EchoMessage) -> Self {
        Self {
            input_data: domain.data,
            processed: domain.is_processed,
            processed_timestamp: domain.processed_timestamp,
            up_timestamp: domain.service_start_time,
        }
    }
}
