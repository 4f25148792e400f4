use std::env;
use std::fs;
use std::path::Path;

use campusflow_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

use crate::logging::init_logging;

struct ConfigField {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };
    init_logging(&config.logging);

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<ConfigField> {
    vec![
        ConfigField {
            key_path: "workflow.faculty_override",
            env_keys: &["CAMPUSFLOW_WORKFLOW_FACULTY_OVERRIDE"],
            value: config.workflow.faculty_override.to_string(),
        },
        ConfigField {
            key_path: "workflow.recent_activity_limit",
            env_keys: &["CAMPUSFLOW_WORKFLOW_RECENT_ACTIVITY_LIMIT"],
            value: config.workflow.recent_activity_limit.to_string(),
        },
        ConfigField {
            key_path: "workflow.dashboard_recent_limit",
            env_keys: &["CAMPUSFLOW_WORKFLOW_DASHBOARD_RECENT_LIMIT"],
            value: config.workflow.dashboard_recent_limit.to_string(),
        },
        ConfigField {
            key_path: "seed.demo_data",
            env_keys: &["CAMPUSFLOW_SEED_DEMO_DATA"],
            value: config.seed.demo_data.to_string(),
        },
        ConfigField {
            key_path: "logging.level",
            env_keys: &["CAMPUSFLOW_LOGGING_LEVEL", "CAMPUSFLOW_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        ConfigField {
            key_path: "logging.format",
            env_keys: &["CAMPUSFLOW_LOGGING_FORMAT", "CAMPUSFLOW_LOG_FORMAT"],
            value: config.logging.format.as_str().to_string(),
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env_value_set(key)) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

/// Mirrors the loader: blank variables do not override anything.
fn env_value_set(key: &str) -> bool {
    env::var(key).is_ok_and(|value| !value.trim().is_empty())
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
