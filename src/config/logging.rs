use super::{ConfigParameter, Environment};
use arc_swap::ArcSwapOption;
use serde_json::{Map, Value};
use std::fmt as stdfmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing::Subscriber;
use tracing_subscriber::{
    fmt, fmt::MakeWriter, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter,
    Registry,
};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{0}'")]
    InvalidLevel(String),

    #[error("invalid log filter '{directives}': {reason}")]
    InvalidFilter { directives: String, reason: String },

    #[error("failed to open log file '{path}': {source}")]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to install log subscriber: {0}")]
    Install(String),

    #[error("failed to reload log filter: {0}")]
    Reload(String),
}

/// Logging setup derived from configuration.
///
/// Built once from the settings snapshot and handed to [`init`]; a reload
/// derives a fresh value and re-applies it through [`LogHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
    pub logger_names: Vec<String>,
    pub logger_level: Option<String>,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            logger_names: Vec::new(),
            logger_level: None,
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn from_settings(settings: &Map<String, Value>) -> Self {
        let text = |param: ConfigParameter| {
            settings
                .get(param.as_ref())
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let logger_names = match settings.get(ConfigParameter::LogLoggerNames.as_ref()) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(list)) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        let json = text(ConfigParameter::AppEnvironment)
            .map(|env| Environment::parse_lenient(&env).is_production())
            .unwrap_or(false);

        Self {
            level: text(ConfigParameter::LogLevel).unwrap_or_else(|| "info".to_string()),
            file: text(ConfigParameter::LogFile).map(PathBuf::from),
            logger_names,
            logger_level: text(ConfigParameter::LogLoggerLevel),
            json,
        }
    }

    /// Filter directives: the global level followed by one `target=level`
    /// entry per configured logger.
    pub fn directives(&self) -> Result<String, LoggingError> {
        let global = normalize_level(&self.level)?;
        let mut directives = vec![global.to_string()];

        if !self.logger_names.is_empty() {
            let per_logger = match &self.logger_level {
                Some(level) => normalize_level(level)?,
                None => global,
            };
            directives.extend(
                self.logger_names
                    .iter()
                    .map(|name| format!("{}={per_logger}", name.replace('.', "::"))),
            );
        }

        Ok(directives.join(","))
    }

    pub fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        let directives = self.directives()?;
        EnvFilter::try_new(&directives).map_err(|e| LoggingError::InvalidFilter {
            directives,
            reason: e.to_string(),
        })
    }
}

fn normalize_level(level: &str) -> Result<&'static str, LoggingError> {
    let lowered = level.trim().to_ascii_lowercase();
    let canonical = match lowered.as_str() {
        "warning" => "warn",
        "critical" | "fatal" => "error",
        other => other,
    };
    let filter =
        LevelFilter::from_str(canonical).map_err(|_| LoggingError::InvalidLevel(level.to_string()))?;
    Ok(match filter {
        LevelFilter::OFF => "off",
        LevelFilter::ERROR => "error",
        LevelFilter::WARN => "warn",
        LevelFilter::INFO => "info",
        LevelFilter::DEBUG => "debug",
        _ => "trace",
    })
}

/// Plain-text log file the file sink writes to, swappable at runtime.
///
/// Events are dropped while no file is configured.
#[derive(Clone, Default)]
pub struct FileSink {
    current: Arc<ArcSwapOption<OpenLogFile>>,
}

struct OpenLogFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileSink {
    /// Point the sink at `path`, or detach it. Reopening the current path is a no-op.
    pub fn open(&self, path: Option<&Path>) -> Result<(), LoggingError> {
        let Some(path) = path else {
            self.current.store(None);
            return Ok(());
        };
        if self.path().as_deref() == Some(path) {
            return Ok(());
        }
        let file = open_log_file(path)?;
        self.current.store(Some(Arc::new(OpenLogFile {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })));
        Ok(())
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.current.load_full().map(|open| open.path.clone())
    }
}

impl stdfmt::Debug for FileSink {
    fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
        f.debug_struct("FileSink").field("path", &self.path()).finish()
    }
}

/// Writer for one event, bound to the file that was current when it started.
pub struct FileSinkWriter(Option<Arc<OpenLogFile>>);

impl Write for FileSinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.0 {
            Some(open) => open
                .file
                .lock()
                .map_err(|_| io::Error::other("log file lock poisoned"))?
                .write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &self.0 {
            Some(open) => open
                .file
                .lock()
                .map_err(|_| io::Error::other("log file lock poisoned"))?
                .flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for FileSink {
    type Writer = FileSinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        FileSinkWriter(self.current.load_full())
    }
}

/// Handle to the installed subscriber, used to re-apply configuration on reload.
///
/// The filter and the file sink follow the new configuration; the console
/// format is fixed at install time.
#[derive(Debug, Clone)]
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    file: FileSink,
}

impl LogHandle {
    pub fn apply(&self, config: &LoggingConfig) -> Result<(), LoggingError> {
        let filter = config.env_filter()?;
        self.file.open(config.file.as_deref())?;
        self.filter
            .reload(filter)
            .map_err(|e| LoggingError::Reload(e.to_string()))
    }

    pub fn file_path(&self) -> Option<PathBuf> {
        self.file.path()
    }
}

/// Reloadable filter, console sink (JSON in production) and the swappable
/// plain-text file sink, not yet installed.
pub(crate) fn subscriber(
    config: &LoggingConfig,
) -> Result<(impl Subscriber + Send + Sync + 'static, LogHandle), LoggingError> {
    let filter = config.env_filter()?;
    let file = FileSink::default();
    file.open(config.file.as_deref())?;
    let (filter_layer, handle) = reload::Layer::new(filter);

    let subscriber = tracing_subscriber::registry()
        .with(filter_layer)
        .with(config.json.then(|| fmt::layer().json()))
        .with((!config.json).then(fmt::layer))
        .with(fmt::layer().with_ansi(false).with_writer(file.clone()));

    Ok((
        subscriber,
        LogHandle {
            filter: handle,
            file,
        },
    ))
}

/// Install the global subscriber built from `config`.
pub fn init(config: &LoggingConfig) -> Result<LogHandle, LoggingError> {
    let (subscriber, handle) = subscriber(config)?;
    subscriber
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;
    Ok(handle)
}

/// Like [`init`], but never fails: on error a minimal INFO console
/// subscriber is installed instead.
pub fn init_or_fallback(config: &LoggingConfig) -> Option<LogHandle> {
    match init(config) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("logging setup failed ({e}), falling back to console logging");
            let _ = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::INFO)
                .try_init();
            None
        }
    }
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| LoggingError::OpenFile {
            path: path.to_path_buf(),
            source,
        })?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::OpenFile {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_defaults_when_keys_missing() {
        let config = LoggingConfig::from_settings(&Map::new());
        assert_eq!(config, LoggingConfig::default());
        assert_eq!(config.directives().unwrap(), "info");
    }

    #[test]
    fn test_from_settings() {
        let config = LoggingConfig::from_settings(&settings(json!({
            "log_level": "DEBUG",
            "log_file": "logs/app.log",
            "log_logger_names": ["hyper", "tower_http"],
            "log_logger_level": "WARNING",
            "app_environment": "production",
        })));
        assert_eq!(config.file, Some(PathBuf::from("logs/app.log")));
        assert!(config.json);
        assert_eq!(
            config.directives().unwrap(),
            "debug,hyper=warn,tower_http=warn"
        );
    }

    #[test]
    fn test_logger_names_from_comma_list() {
        let config = LoggingConfig::from_settings(&settings(json!({
            "log_logger_names": "hyper, nanoservice.controller",
        })));
        assert_eq!(
            config.directives().unwrap(),
            "info,hyper=info,nanoservice::controller=info"
        );
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(config.env_filter(), Err(LoggingError::InvalidLevel(_))));
    }

    fn file_config(path: &Path) -> LoggingConfig {
        LoggingConfig {
            file: Some(path.to_path_buf()),
            ..LoggingConfig::default()
        }
    }

    #[test]
    fn test_reload_moves_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.log");
        let second = dir.path().join("nested/second.log");

        let (subscriber, handle) = subscriber(&file_config(&first)).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("before reload");
            handle.apply(&file_config(&second)).unwrap();
            tracing::info!("after reload");
        });

        assert_eq!(handle.file_path(), Some(second.clone()));
        let first = std::fs::read_to_string(first).unwrap();
        let second = std::fs::read_to_string(second).unwrap();
        assert!(first.contains("before reload"));
        assert!(!first.contains("after reload"));
        assert!(second.contains("after reload"));
    }

    #[test]
    fn test_reload_attaches_file_sink_late() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.log");

        let (subscriber, handle) = subscriber(&LoggingConfig::default()).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("dropped");
            handle.apply(&file_config(&path)).unwrap();
            tracing::info!("kept");
        });

        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("kept"));
        assert!(!text.contains("dropped"));
    }

    #[test]
    fn test_reload_applies_new_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.log");

        let (subscriber, handle) = subscriber(&file_config(&path)).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!("hidden at info");
            handle
                .apply(&LoggingConfig {
                    level: "debug".to_string(),
                    ..file_config(&path)
                })
                .unwrap();
            tracing::debug!("shown at debug");
        });

        let text = std::fs::read_to_string(path).unwrap();
        assert!(!text.contains("hidden at info"));
        assert!(text.contains("shown at debug"));
    }

    #[test]
    fn test_critical_maps_to_error() {
        assert_eq!(normalize_level("CRITICAL").unwrap(), "error");
        assert!(
            LoggingConfig::default().env_filter().is_ok()
        );
    }
}
