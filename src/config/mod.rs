//! Layered configuration with a validity flag.
//!
//! [`ConfigService`] holds one immutable snapshot of the merged settings and
//! their validity. Reload and invalidate swap the whole snapshot at once, so
//! readers never observe a half-updated state.

mod error;
pub mod logging;
mod params;
mod source;

pub use error::ConfigError;
pub use logging::{LogHandle, LoggingConfig, LoggingError};
pub use params::{ConfigParameter, Environment};
pub use source::{ConfigLoader, LOCAL_SETTINGS_FILE};

use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Validity {
    Valid,
    Invalid(String),
}

#[derive(Debug)]
struct Snapshot {
    settings: Option<Arc<Map<String, Value>>>,
    validity: Validity,
}

/// Configuration provider shared by every controller and service.
#[derive(Debug)]
pub struct ConfigService {
    state: ArcSwap<Snapshot>,
    logging: OnceLock<LogHandle>,
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigService {
    /// A provider with nothing loaded yet; reads fail until a reload succeeds.
    pub fn new() -> Self {
        Self {
            state: ArcSwap::from_pointee(Snapshot {
                settings: None,
                validity: Validity::Valid,
            }),
            logging: OnceLock::new(),
        }
    }

    /// A valid provider over an already merged settings table.
    pub fn from_settings(settings: Map<String, Value>) -> Self {
        let service = Self::new();
        service.state.store(Arc::new(Snapshot {
            settings: Some(Arc::new(settings)),
            validity: Validity::Valid,
        }));
        service
    }

    /// Load `path` with the standard layering into a new provider.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let service = Self::new();
        service.reload(path)?;
        Ok(service)
    }

    /// Re-read `path`, `settings.toml` and the process environment.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.reload_from(ConfigLoader::standard(path))
    }

    /// Replace the snapshot with whatever `loader` produces.
    ///
    /// On success the provider becomes valid again and the logging
    /// configuration (levels and file sink) is re-applied. On failure the
    /// previous snapshot is kept as is.
    pub fn reload_from(&self, loader: ConfigLoader) -> Result<(), ConfigError> {
        let settings = loader.load()?;
        let logging = LoggingConfig::from_settings(&settings);

        self.state.store(Arc::new(Snapshot {
            settings: Some(Arc::new(settings)),
            validity: Validity::Valid,
        }));
        tracing::info!("configuration reloaded");

        if let Some(handle) = self.logging.get() {
            if let Err(e) = handle.apply(&logging) {
                tracing::warn!(error = %e, "could not re-apply logging configuration");
            }
        }
        Ok(())
    }

    /// Mark the configuration unusable; only a successful reload clears it.
    pub fn invalidate(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!(%reason, "configuration invalidated");
        self.state.rcu(|current| Snapshot {
            settings: current.settings.clone(),
            validity: Validity::Invalid(reason.clone()),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.state.load().validity == Validity::Valid
    }

    /// The invalidation reason, empty while valid.
    pub fn reason(&self) -> String {
        match &self.state.load().validity {
            Validity::Valid => String::new(),
            Validity::Invalid(reason) => reason.clone(),
        }
    }

    /// Look up a key; dotted keys (`a.b`) walk nested tables.
    pub fn get(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        let settings = self.settings()?;
        let value = lookup(&settings, key).cloned();
        tracing::debug!(key, found = value.is_some(), "config lookup");
        Ok(value)
    }

    /// Typed lookup falling back to `default` when the key is absent.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.get(key)? {
            None | Some(Value::Null) => Ok(default),
            Some(value) => serde_json::from_value(value).map_err(|source| {
                ConfigError::TypeMismatch {
                    key: key.to_string(),
                    source,
                }
            }),
        }
    }

    pub fn param(&self, param: ConfigParameter) -> Result<Option<Value>, ConfigError> {
        self.get(param.as_ref())
    }

    pub fn param_or<T: DeserializeOwned>(
        &self,
        param: ConfigParameter,
        default: T,
    ) -> Result<T, ConfigError> {
        self.get_or(param.as_ref(), default)
    }

    pub fn environment(&self) -> Result<Environment, ConfigError> {
        let raw: String = self.param_or(ConfigParameter::AppEnvironment, String::new())?;
        Ok(Environment::parse_lenient(&raw))
    }

    /// Logging setup derived from the current snapshot, defaults if nothing is loaded.
    pub fn logging_config(&self) -> LoggingConfig {
        match &self.state.load().settings {
            Some(settings) => LoggingConfig::from_settings(settings),
            None => LoggingConfig::default(),
        }
    }

    /// Attach the installed log handle so later reloads can re-apply levels.
    pub fn attach_logging(&self, handle: LogHandle) {
        if self.logging.set(handle).is_err() {
            tracing::warn!("logging handle already attached, ignoring");
        }
    }

    fn settings(&self) -> Result<Arc<Map<String, Value>>, ConfigError> {
        let snapshot = self.state.load();
        let settings = snapshot.settings.clone().ok_or(ConfigError::NotInitialized)?;
        match &snapshot.validity {
            Validity::Valid => Ok(settings),
            Validity::Invalid(reason) => Err(ConfigError::Invalid {
                reason: reason.clone(),
            }),
        }
    }
}

fn lookup<'a>(settings: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = settings.get(key) {
        return Some(value);
    }
    let mut parts = key.split('.');
    let first = settings.get(parts.next()?)?;
    parts.try_fold(first, |value, part| value.as_object()?.get(part))
}
