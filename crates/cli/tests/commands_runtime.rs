use std::env;
use std::sync::{Mutex, OnceLock};

use campusflow_cli::commands::dashboard::DashboardArgs;
use campusflow_cli::commands::{config, dashboard, seed, smoke, start};
use campusflow_core::config::{ConfigOverrides, LoadOptions};
use serde_json::Value;

#[test]
fn start_returns_success_with_default_config() {
    with_env(&[], || {
        let result = start::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected successful start preflight");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("faculty_override=on"), "{message}");
        assert!(message.contains("requests_loaded=0"), "{message}");
    });
}

#[test]
fn start_loads_demo_data_when_enabled_by_env() {
    with_env(&[("CAMPUSFLOW_SEED_DEMO_DATA", "true")], || {
        let result = start::run(LoadOptions::default());
        assert_eq!(result.exit_code, 0, "expected seeded start preflight");

        let payload = parse_payload(&result.output);
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("requests_loaded=2"), "{message}");
    });
}

#[test]
fn start_overrides_beat_env_values() {
    with_env(&[("CAMPUSFLOW_WORKFLOW_FACULTY_OVERRIDE", "true")], || {
        let result = start::run(LoadOptions {
            overrides: ConfigOverrides {
                faculty_override: Some(false),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("faculty_override=off"), "{message}");
    });
}

#[test]
fn start_returns_config_failure_for_invalid_limit() {
    with_env(&[("CAMPUSFLOW_WORKFLOW_RECENT_ACTIVITY_LIMIT", "0")], || {
        let result = start::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "start");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn start_returns_config_failure_for_unparseable_flag() {
    with_env(&[("CAMPUSFLOW_WORKFLOW_FACULTY_OVERRIDE", "sometimes")], || {
        let result = start::run(LoadOptions::default());
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_returns_deterministic_request_summary() {
    with_env(&[], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected deterministic seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains(
            "  - room-booking-in-progress: Room booking approved by Facilities, awaiting IT"
        ));
        assert!(message.contains("  - equipment-request-pending: Equipment request awaiting Finance"));
    });
}

#[test]
fn seed_is_deterministic_across_runs() {
    with_env(&[], || {
        let first = seed::run();
        let second = seed::run();
        assert_eq!(first.exit_code, 0);
        assert_eq!(second.exit_code, 0);

        let first_payload = parse_payload(&first.output);
        let second_payload = parse_payload(&second.output);
        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn smoke_returns_success_report_with_default_config() {
    with_env(&[], || {
        let result = smoke::run();
        assert_eq!(result.exit_code, 0, "expected successful smoke report: {}", result.output);

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "smoke");
        assert_eq!(payload["status"], "pass");
        assert_eq!(payload["checks"].as_array().map(Vec::len), Some(9));
        assert!(result.output.starts_with("smoke: 9/9 checks passed"));
    });
}

#[test]
fn smoke_returns_failure_when_config_invalid() {
    with_env(&[("CAMPUSFLOW_LOGGING_FORMAT", "xml")], || {
        let result = smoke::run();
        assert_eq!(result.exit_code, 6, "expected smoke failure code");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "smoke");
        assert_eq!(payload["status"], "fail");
        assert_eq!(payload["checks"][0]["status"], "fail");
        assert_eq!(payload["checks"][1]["status"], "skipped");
    });
}

#[test]
fn config_reports_env_sources() {
    with_env(&[("CAMPUSFLOW_LOG_LEVEL", "debug")], || {
        let output = config::run();

        assert!(output.starts_with("effective config (source precedence: env > file > default):"));
        assert!(output.contains("- logging.level = debug (source: env (CAMPUSFLOW_LOG_LEVEL))"));
        assert!(output.contains("- workflow.faculty_override = true (source: default)"));
    });
}

#[test]
fn dashboard_scopes_student_to_own_requests() {
    with_env(&[], || {
        let result = dashboard::run(DashboardArgs {
            actor_id: "999".to_string(),
            name: "Sam Student".to_string(),
            role: "student".to_string(),
            department: None,
        });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "dashboard");
        assert_eq!(payload["data"]["counts"]["total"], 0);
    });
}

#[test]
fn dashboard_gives_staff_the_full_view() {
    with_env(&[], || {
        let result = dashboard::run(DashboardArgs {
            actor_id: "201".to_string(),
            name: "Facilities Office".to_string(),
            role: "staff".to_string(),
            department: Some("Facilities".to_string()),
        });
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["counts"]["total"], 2);
        assert_eq!(payload["data"]["counts"]["pending"], 1);
        assert_eq!(payload["data"]["counts"]["in_progress"], 1);
    });
}

#[test]
fn dashboard_rejects_unknown_role() {
    with_env(&[], || {
        let result = dashboard::run(DashboardArgs {
            role: "dean".to_string(),
            ..DashboardArgs::default()
        });
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "bad_request");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "CAMPUSFLOW_WORKFLOW_FACULTY_OVERRIDE",
        "CAMPUSFLOW_WORKFLOW_RECENT_ACTIVITY_LIMIT",
        "CAMPUSFLOW_WORKFLOW_DASHBOARD_RECENT_LIMIT",
        "CAMPUSFLOW_SEED_DEMO_DATA",
        "CAMPUSFLOW_LOGGING_LEVEL",
        "CAMPUSFLOW_LOGGING_FORMAT",
        "CAMPUSFLOW_LOG_LEVEL",
        "CAMPUSFLOW_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
