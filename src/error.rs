use crate::config::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NanoserviceError>;

#[derive(Debug, Error)]
pub enum NanoserviceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Configuration provider was not supplied to the application builder")]
    MissingConfig,

    #[error("Dependency not found: {type_name}")]
    DependencyNotFound { type_name: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Invalid route path '{path}': {reason}")]
    InvalidRoute { path: String, reason: String },

    #[error("Route {method} {path} is already registered")]
    DuplicateRoute { method: String, path: String },

    #[error("Route {path} conflicts with already registered route {existing}")]
    ConflictingRoute { path: String, existing: String },

    #[error("Controller {controller} failed to register: {source}")]
    RegistrationFailed {
        controller: &'static str,
        #[source]
        source: Box<NanoserviceError>,
    },

    #[error("Telemetry setup failed: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NanoserviceError {
    /// Wrap a construction or registration failure with the controller that caused it.
    pub fn registration(controller: &'static str, source: NanoserviceError) -> Self {
        Self::RegistrationFailed {
            controller,
            source: Box::new(source),
        }
    }
}
