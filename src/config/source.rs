use super::{ConfigError, ConfigParameter};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;

/// Settings file picked up from the working directory when present.
pub const LOCAL_SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug)]
enum Source {
    File { path: PathBuf, required: bool },
    Env(HashMap<String, String>),
}

/// Layered configuration loader.
///
/// Sources are merged in registration order, later sources overriding
/// earlier ones. Nested tables are merged recursively; every other value
/// (arrays included) is replaced as a whole.
///
/// ```no_run
/// use nanoservice::config::ConfigLoader;
///
/// let settings = ConfigLoader::new()
///     .with_file("config/config.json", true)
///     .with_file("settings.toml", false)
///     .with_process_env()
///     .load()?;
/// # Ok::<(), nanoservice::config::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "loaders do nothing until .load() is called"]
pub struct ConfigLoader {
    sources: Vec<Source>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard layering: `path` (required), `settings.toml` (optional),
    /// then the process environment.
    pub fn standard(path: impl AsRef<Path>) -> Self {
        Self::new()
            .with_file(path, true)
            .with_file(LOCAL_SETTINGS_FILE, false)
            .with_process_env()
    }

    /// Adds a JSON file, or a TOML file when the extension is `.toml`.
    ///
    /// Missing optional files are skipped.
    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        self.sources.push(Source::File {
            path: path.as_ref().to_path_buf(),
            required,
        });
        self
    }

    /// Adds environment overrides from explicit `NAME=value` pairs.
    ///
    /// Only the upper-cased names of known [`ConfigParameter`] keys are
    /// considered (`APP_PORT`, `LOG_LEVEL`, ...).
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.sources.push(Source::Env(vars));
        self
    }

    pub fn with_process_env(self) -> Self {
        self.with_env_vars(std::env::vars())
    }

    pub fn load(self) -> Result<Map<String, Value>, ConfigError> {
        let mut merged = Map::new();

        for source in self.sources {
            match source {
                Source::File { path, required } => {
                    if let Some(table) = load_file(&path, required)? {
                        deep_merge(&mut merged, table);
                    }
                }
                Source::Env(vars) => {
                    deep_merge(&mut merged, env_overrides(&vars));
                }
            }
        }

        Ok(merged)
    }
}

fn load_file(path: &Path, required: bool) -> Result<Option<Map<String, Value>>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            tracing::debug!(path = %path.display(), "optional config file not found, skipping");
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::ReadError {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let value = if is_toml(path) {
        let table: toml::Table =
            toml::from_str(&content).map_err(|source| ConfigError::TomlParseError {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::to_value(table).map_err(|source| ConfigError::JsonParseError {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_json::from_str(&content).map_err(|source| ConfigError::JsonParseError {
            path: path.to_path_buf(),
            source,
        })?
    };

    match value {
        Value::Object(map) => Ok(Some(map)),
        _ => Err(ConfigError::NotATable(path.to_path_buf())),
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

fn env_overrides(vars: &HashMap<String, String>) -> Map<String, Value> {
    ConfigParameter::iter()
        .filter_map(|param| {
            vars.get(&param.env_var())
                .map(|raw| (param.as_ref().to_string(), coerce_value(raw)))
        })
        .collect()
}

/// Merge `overlay` into `base`; tables merge recursively, anything else replaces.
pub(crate) fn deep_merge(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn coerce_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }

    if looks_like_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Value::from(i);
        }
    }

    if s.contains('.') {
        if let Ok(f) = s.parse::<f64>() {
            if f.is_finite() {
                return Value::from(f);
            }
        }
    }

    // Structured overrides such as LOG_LOGGER_NAMES='["hyper","tower"]'
    let trimmed = s.trim_start();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(value @ (Value::Array(_) | Value::Object(_))) = serde_json::from_str(s) {
            return value;
        }
    }

    Value::String(s.to_string())
}

fn looks_like_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_loads_json_file() {
        let file = write_file(".json", r#"{"app_name": "demo", "app_port": 9000}"#);
        let settings = ConfigLoader::new().with_file(file.path(), true).load().unwrap();
        assert_eq!(settings["app_name"], json!("demo"));
        assert_eq!(settings["app_port"], json!(9000));
    }

    #[test]
    fn test_toml_overrides_json() {
        let base = write_file(".json", r#"{"app_name": "demo", "nested": {"a": 1, "b": 2}}"#);
        let local = write_file(".toml", "app_name = \"local\"\n[nested]\nb = 3\n");
        let settings = ConfigLoader::new()
            .with_file(base.path(), true)
            .with_file(local.path(), false)
            .load()
            .unwrap();
        assert_eq!(settings["app_name"], json!("local"));
        assert_eq!(settings["nested"], json!({"a": 1, "b": 3}));
    }

    #[test]
    fn test_missing_required_file_fails() {
        let err = ConfigLoader::new()
            .with_file("/nonexistent/config.json", true)
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_missing_optional_file_is_skipped() {
        let settings = ConfigLoader::new()
            .with_file("/nonexistent/settings.toml", false)
            .load()
            .unwrap();
        assert!(settings.is_empty());
    }

    #[test]
    fn test_top_level_must_be_a_table() {
        let file = write_file(".json", "[1, 2, 3]");
        let err = ConfigLoader::new().with_file(file.path(), true).load().unwrap_err();
        assert!(matches!(err, ConfigError::NotATable(_)));
    }

    #[test]
    fn test_malformed_json_reports_parse_error() {
        let file = write_file(".json", "{not json");
        let err = ConfigLoader::new().with_file(file.path(), true).load().unwrap_err();
        assert!(matches!(err, ConfigError::JsonParseError { .. }));
    }

    #[test]
    fn test_env_overrides_known_keys_only() {
        let file = write_file(".json", r#"{"app_port": 8080, "log_level": "info"}"#);
        let settings = ConfigLoader::new()
            .with_file(file.path(), true)
            .with_env_vars([
                ("APP_PORT", "9090"),
                ("APP_MCP", "TRUE"),
                ("LOG_LOGGER_NAMES", r#"["hyper", "tower"]"#),
                ("HOME", "/root"),
            ])
            .load()
            .unwrap();
        assert_eq!(settings["app_port"], json!(9090));
        assert_eq!(settings["app_mcp"], json!(true));
        assert_eq!(settings["log_logger_names"], json!(["hyper", "tower"]));
        assert_eq!(settings["log_level"], json!("info"));
        assert!(!settings.contains_key("home"));
    }

    #[test]
    fn test_coerce_value() {
        assert_eq!(coerce_value("false"), json!(false));
        assert_eq!(coerce_value("-12"), json!(-12));
        assert_eq!(coerce_value("1.5"), json!(1.5));
        assert_eq!(coerce_value("1.2.3"), json!("1.2.3"));
        assert_eq!(coerce_value("[broken"), json!("[broken"));
        assert_eq!(coerce_value("/api"), json!("/api"));
    }
}
