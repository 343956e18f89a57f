use crate::domain::{EchoInput, EchoMessage};
use chrono::{DateTime, Utc};

/// Reflects its input back with processing timestamps.
#[derive(Debug, Clone)]
pub struct EchoService {
    started_at: DateTime<Utc>,
}

impl Default for EchoService {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoService {
    pub fn new() -> Self {
        Self::started_at(Utc::now())
    }

    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self { started_at }
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn process(&self, input: EchoInput) -> EchoMessage {
        // Wall clock can step backwards; never report processing before startup.
        let processed_timestamp = Utc::now().max(self.started_at);
        tracing::debug!(keys = input.data.len(), "processing echo");

        EchoMessage {
            data: input.data,
            metadata: input.metadata.unwrap_or_default(),
            processed_timestamp,
            service_start_time: self.started_at,
            is_processed: true,
        }
    }
}
