//! Configuration loaded from the environment.
//!
//! Required variables:
//! - `MONGODB_CONNECTION_STRING`: MongoDB connection string, checked on load
//! - `MONGODB_DB_NAME`: database name
//! - `MONGODB_DB_COLLECTION`: collection receiving tracked messages
//! - `ANTHROPIC_API_KEY`: language model API key
//! - `HERALD_GROUP_NAME`: display name of the tracked group
//!
//! Optional variables:
//! - `HERALD_LOG`: minimum log level (default: `info`)
//! - `HERALD_LOG_FILE`: file receiving a plain copy of every log line
//! - `HERALD_INSTRUMENT`: instrument handler callbacks (default: `false`)

use ::config::{Config, Environment, Map};
use herald_std::LogLevel;
use mongodb::options::ConnectionString;
use std::path::PathBuf;
use thiserror::Error;

/// Store connection string.
pub const CONNECTION_STRING_VAR: &str = "MONGODB_CONNECTION_STRING";
/// Database name.
pub const DB_NAME_VAR: &str = "MONGODB_DB_NAME";
/// Collection receiving tracked messages.
pub const COLLECTION_VAR: &str = "MONGODB_DB_COLLECTION";
/// Language model API key.
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";
/// Display name of the tracked group.
pub const GROUP_NAME_VAR: &str = "HERALD_GROUP_NAME";
/// Minimum log level.
pub const LOG_LEVEL_VAR: &str = "HERALD_LOG";
/// Log file path.
pub const LOG_FILE_VAR: &str = "HERALD_LOG_FILE";
/// Handler instrumentation switch.
pub const INSTRUMENT_VAR: &str = "HERALD_INSTRUMENT";

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable holds a value that cannot be used.
    #[error("invalid value for {var}: {reason}")]
    Invalid {
        /// The offending variable.
        var: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The configuration sources could not be read.
    #[error(transparent)]
    Source(#[from] ::config::ConfigError),
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeraldConfig {
    /// Store connection string.
    pub connection_string: String,
    /// Database name.
    pub db_name: String,
    /// Collection receiving tracked messages.
    pub collection: String,
    /// Language model API key.
    pub api_key: String,
    /// Display name of the tracked group.
    pub group_name: String,
    /// Minimum log level.
    pub log_level: LogLevel,
    /// Log file path.
    pub log_file: Option<PathBuf>,
    /// Whether handler callbacks are instrumented.
    pub instrument: bool,
}

impl HeraldConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(Environment::default())
    }

    /// Loads configuration from `vars` instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::load(Environment::default().source(Some(vars)))
    }

    fn load(env: Environment) -> Result<Self, ConfigError> {
        let config = Config::builder().add_source(env).build()?;
        let lookup = Lookup(&config);

        let log_level = match lookup.optional(LOG_LEVEL_VAR)? {
            Some(raw) => raw.parse().map_err(|err: herald_std::logger::ParseLevelError| {
                ConfigError::Invalid {
                    var: LOG_LEVEL_VAR,
                    reason: err.to_string(),
                }
            })?,
            None => LogLevel::Info,
        };

        let instrument = match lookup.optional(INSTRUMENT_VAR)? {
            Some(raw) => parse_flag(&raw).ok_or_else(|| ConfigError::Invalid {
                var: INSTRUMENT_VAR,
                reason: format!("expected a boolean, got {raw:?}"),
            })?,
            None => false,
        };

        let connection_string = lookup.required(CONNECTION_STRING_VAR)?;
        ConnectionString::parse(&connection_string).map_err(|err| ConfigError::Invalid {
            var: CONNECTION_STRING_VAR,
            reason: err.to_string(),
        })?;

        Ok(Self {
            connection_string,
            db_name: lookup.required(DB_NAME_VAR)?,
            collection: lookup.required(COLLECTION_VAR)?,
            api_key: lookup.required(API_KEY_VAR)?,
            group_name: lookup.required(GROUP_NAME_VAR)?,
            log_level,
            log_file: lookup.optional(LOG_FILE_VAR)?.map(PathBuf::from),
            instrument,
        })
    }
}

/// Reads variables by their upper-case name; the source lower-cases keys.
struct Lookup<'a>(&'a Config);

impl Lookup<'_> {
    fn optional(&self, var: &'static str) -> Result<Option<String>, ConfigError> {
        match self.0.get_string(&var.to_ascii_lowercase()) {
            Ok(value) if value.trim().is_empty() => Ok(None),
            Ok(value) => Ok(Some(value.trim().to_string())),
            Err(::config::ConfigError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn required(&self, var: &'static str) -> Result<String, ConfigError> {
        self.optional(var)?.ok_or(ConfigError::Missing(var))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
