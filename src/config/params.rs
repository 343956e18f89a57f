use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// The fixed set of configuration keys the service understands.
///
/// The serialized form is the key used in config files (`app_port`); the
/// upper-cased form is the environment variable that overrides it (`APP_PORT`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ConfigParameter {
    AppName,
    AppDescription,
    AppPort,
    AppVersion,
    AppEnvironment,
    AppUrlPrefix,
    AppMcp,
    LogLevel,
    LogFile,
    LogLoggerNames,
    LogLoggerLevel,
    BuildCommit,
    BuildTimestamp,
}

const GROUPS: [(&str, &str); 3] = [("app_", "app"), ("log_", "logs"), ("build_", "build")];

impl ConfigParameter {
    /// Name of the environment variable overriding this key.
    pub fn env_var(self) -> String {
        self.as_ref().to_ascii_uppercase()
    }

    /// Info group and short name, e.g. `log_file` -> `("logs", "file")`.
    pub fn group(self) -> (&'static str, &'static str) {
        let key: &'static str = self.into();
        GROUPS
            .iter()
            .find_map(|(prefix, group)| key.strip_prefix(prefix).map(|short| (*group, short)))
            .unwrap_or(("app", key))
    }
}

/// Deployment environment, parsed from `app_environment`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Parse leniently: anything unrecognised is treated as development.
    pub fn parse_lenient(value: &str) -> Self {
        value.trim().parse().unwrap_or_default()
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}
