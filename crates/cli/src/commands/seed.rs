use campusflow_core::config::LoadOptions;
use campusflow_core::flows::{ApprovalStateMachine, CampusSequencer};
use campusflow_db::{InMemoryRequestRepository, RequestSeedInfo, SeedDataset};

use crate::commands::{build_runtime, load_config, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed", LoadOptions::default()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let runtime = match build_runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let clock = SeedDataset::clock();
    let repo = InMemoryRequestRepository::new(ApprovalStateMachine::new(
        CampusSequencer,
        clock.clone(),
    ))
    .configured(&config);

    let result = runtime.block_on(async {
        let seed_result = SeedDataset::load_at(&repo, &clock)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = SeedDataset::verify(&repo)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        if !verification.all_present {
            return Err(("seed_verification", verification_failure_message(&verification.checks), 6u8));
        }
        Ok(seed_result.requests_seeded)
    });

    match result {
        Ok(requests) => CommandResult::success("seed", seed_summary(&requests)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn seed_summary(requests: &[RequestSeedInfo]) -> String {
    let lines: Vec<String> = requests
        .iter()
        .map(|info| format!("  - {}: {}", info.key, info.description))
        .collect();
    format!("demo dataset loaded ({} requests):\n{}", requests.len(), lines.join("\n"))
}

fn verification_failure_message(checks: &[(&str, bool)]) -> String {
    let failed_checks = checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
