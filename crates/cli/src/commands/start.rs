use std::sync::Arc;

use campusflow_core::config::LoadOptions;
use campusflow_core::notifications::TracingNotificationSink;
use campusflow_db::{InMemoryRequestRepository, SeedDataset};
use tracing::info;

use crate::commands::{build_runtime, load_config, CommandResult};

/// Preflight: loads config, builds the in-memory workflow runtime and, when
/// `seed.demo_data` is on, loads and verifies the demo requests.
pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("start", options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let runtime = match build_runtime("start") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let repo = InMemoryRequestRepository::from_config(&config)
        .with_notifications(Arc::new(TracingNotificationSink));

    let result = runtime.block_on(async {
        if config.seed.demo_data {
            SeedDataset::load(&repo)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            let verification = SeedDataset::verify(&repo)
                .await
                .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
            if !verification.all_present {
                return Err((
                    "seed_verification",
                    "demo data did not match its fixtures".to_string(),
                    6u8,
                ));
            }
        }
        Ok(repo.len().await)
    });

    match result {
        Ok(requests_loaded) => {
            info!(
                event_name = "workflow.runtime.started",
                faculty_override = config.workflow.faculty_override,
                requests_loaded,
                "workflow runtime ready"
            );
            CommandResult::success(
                "start",
                format!(
                    "workflow runtime ready (faculty_override={}, recent_activity_limit={}, dashboard_recent_limit={}, requests_loaded={requests_loaded})",
                    on_off(config.workflow.faculty_override),
                    config.workflow.recent_activity_limit,
                    config.workflow.dashboard_recent_limit,
                ),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("start", error_class, message, exit_code)
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
