use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["campusflow.toml", "config/campusflow.toml"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub workflow: WorkflowConfig,
    pub seed: SeedConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Lets a named faculty sponsor decide the first step of a student request.
    pub faculty_override: bool,
    pub recent_activity_limit: usize,
    pub dashboard_recent_limit: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedConfig {
    pub demo_data: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub faculty_override: Option<bool>,
    pub recent_activity_limit: Option<usize>,
    pub dashboard_recent_limit: Option<usize>,
    pub seed_demo_data: Option<bool>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workflow: WorkflowConfig {
                faculty_override: true,
                recent_activity_limit: 5,
                dashboard_recent_limit: 3,
            },
            seed: SeedConfig { demo_data: false },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(workflow) = patch.workflow {
            if let Some(faculty_override) = workflow.faculty_override {
                self.workflow.faculty_override = faculty_override;
            }
            if let Some(limit) = workflow.recent_activity_limit {
                self.workflow.recent_activity_limit = limit;
            }
            if let Some(limit) = workflow.dashboard_recent_limit {
                self.workflow.dashboard_recent_limit = limit;
            }
        }

        if let Some(seed) = patch.seed {
            if let Some(demo_data) = seed.demo_data {
                self.seed.demo_data = demo_data;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CAMPUSFLOW_WORKFLOW_FACULTY_OVERRIDE") {
            self.workflow.faculty_override =
                parse_bool("CAMPUSFLOW_WORKFLOW_FACULTY_OVERRIDE", &value)?;
        }
        if let Some(value) = read_env("CAMPUSFLOW_WORKFLOW_RECENT_ACTIVITY_LIMIT") {
            self.workflow.recent_activity_limit =
                parse_usize("CAMPUSFLOW_WORKFLOW_RECENT_ACTIVITY_LIMIT", &value)?;
        }
        if let Some(value) = read_env("CAMPUSFLOW_WORKFLOW_DASHBOARD_RECENT_LIMIT") {
            self.workflow.dashboard_recent_limit =
                parse_usize("CAMPUSFLOW_WORKFLOW_DASHBOARD_RECENT_LIMIT", &value)?;
        }

        if let Some(value) = read_env("CAMPUSFLOW_SEED_DEMO_DATA") {
            self.seed.demo_data = parse_bool("CAMPUSFLOW_SEED_DEMO_DATA", &value)?;
        }

        let log_level =
            read_env("CAMPUSFLOW_LOGGING_LEVEL").or_else(|| read_env("CAMPUSFLOW_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CAMPUSFLOW_LOGGING_FORMAT").or_else(|| read_env("CAMPUSFLOW_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(faculty_override) = overrides.faculty_override {
            self.workflow.faculty_override = faculty_override;
        }
        if let Some(limit) = overrides.recent_activity_limit {
            self.workflow.recent_activity_limit = limit;
        }
        if let Some(limit) = overrides.dashboard_recent_limit {
            self.workflow.dashboard_recent_limit = limit;
        }
        if let Some(demo_data) = overrides.seed_demo_data {
            self.seed.demo_data = demo_data;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_workflow(&self.workflow)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The file `load` would read for these options, if any exists.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_FILES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_workflow(workflow: &WorkflowConfig) -> Result<(), ConfigError> {
    if !(1..=100).contains(&workflow.recent_activity_limit) {
        return Err(ConfigError::Validation(
            "workflow.recent_activity_limit must be in range 1..=100".to_string(),
        ));
    }

    if !(1..=100).contains(&workflow.dashboard_recent_limit) {
        return Err(ConfigError::Validation(
            "workflow.dashboard_recent_limit must be in range 1..=100".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    workflow: Option<WorkflowPatch>,
    seed: Option<SeedPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkflowPatch {
    faculty_override: Option<bool>,
    recent_activity_limit: Option<usize>,
    dashboard_recent_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedPatch {
    demo_data: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
