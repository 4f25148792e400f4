use std::future::Future;
use std::time::Instant;

use anyhow::{ensure, Context};
use campusflow_core::config::{AppConfig, LoadOptions};
use campusflow_core::domain::{
    Actor, Department, RequestDraft, RequestStatus, RequestType, Requestor, Role, StepStatus,
};
use campusflow_core::errors::DomainError;
use campusflow_core::flows::campus_sequence;
use campusflow_db::{
    DecisionCommand, InMemoryRequestRepository, RepositoryError, RequestRepository, SeedDataset,
};
use serde::Serialize;
use tokio::runtime::Runtime;

use crate::commands::CommandResult;
use crate::logging::init_logging;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

const SCENARIO_CHECKS: [&str; 7] = [
    "sequence_table",
    "maintenance_creation",
    "room_booking_progression",
    "room_booking_completion",
    "equipment_rejection",
    "rejected_request_frozen",
    "department_authorization",
];

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms,
                message: "configuration loaded and validated".to_string(),
            });
            init_logging(&config.logging);
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.extend(SCENARIO_CHECKS.iter().map(|name| skipped(name)));
            checks.push(skipped("seed_contract"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(SmokeCheck {
                name: "sequence_table",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            checks.extend(SCENARIO_CHECKS[1..].iter().map(|name| skipped(name)));
            checks.push(skipped("seed_contract"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    checks.push(run_scenario(&runtime, &config, "sequence_table", |_| sequence_table()));
    checks.push(run_scenario(&runtime, &config, "maintenance_creation", maintenance_creation));
    checks.push(run_scenario(&runtime, &config, "room_booking_progression", room_booking_progression));
    checks.push(run_scenario(&runtime, &config, "room_booking_completion", room_booking_completion));
    checks.push(run_scenario(&runtime, &config, "equipment_rejection", equipment_rejection));
    checks.push(run_scenario(&runtime, &config, "rejected_request_frozen", rejected_request_frozen));
    checks.push(run_scenario(&runtime, &config, "department_authorization", department_authorization));
    checks.push(run_scenario(&runtime, &config, "seed_contract", seed_contract));

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

fn run_scenario<F, Fut>(
    runtime: &Runtime,
    config: &AppConfig,
    name: &'static str,
    scenario: F,
) -> SmokeCheck
where
    F: FnOnce(InMemoryRequestRepository) -> Fut,
    Fut: Future<Output = anyhow::Result<String>>,
{
    let repo = InMemoryRequestRepository::from_config(config);
    match timed_check(|| runtime.block_on(scenario(repo))) {
        Ok((elapsed_ms, message)) => {
            SmokeCheck { name, status: SmokeStatus::Pass, elapsed_ms, message }
        }
        Err((elapsed_ms, error)) => SmokeCheck {
            name,
            status: SmokeStatus::Fail,
            elapsed_ms,
            message: format!("{error:#}"),
        },
    }
}

async fn sequence_table() -> anyhow::Result<String> {
    for request_type in RequestType::ALL {
        ensure!(
            !campus_sequence(request_type).is_empty(),
            "request type `{request_type}` has no approval departments"
        );
    }
    Ok(format!("{} request types carry approval sequences", RequestType::ALL.len()))
}

async fn maintenance_creation(repo: InMemoryRequestRepository) -> anyhow::Result<String> {
    let request = repo
        .create(
            draft("Broken window in dorm room", "maintenance", Role::Student)
                .with_faculty_name("Prof. Alan Chen"),
        )
        .await
        .context("create maintenance request")?;

    ensure!(request.status == RequestStatus::Pending, "expected pending, got {}", request.status);
    ensure!(request.steps.len() == 1, "expected one step, got {}", request.steps.len());
    ensure!(request.steps[0].department == Department::Facilities, "expected Facilities step");
    Ok("maintenance request opens a single Facilities step".to_string())
}

async fn room_booking_progression(repo: InMemoryRequestRepository) -> anyhow::Result<String> {
    let request = repo
        .create(draft("Lecture hall for guest talk", "room_booking", Role::Faculty))
        .await
        .context("create room booking")?;
    let request = repo
        .apply_decision(&request.id, DecisionCommand::approve(0), &staff(Department::Facilities))
        .await
        .context("facilities approval")?;

    ensure!(
        request.status == RequestStatus::InProgress,
        "expected in progress, got {}",
        request.status
    );
    ensure!(request.current_step == 1, "expected step 1, got {}", request.current_step);
    Ok("first approval moves a room booking to IT".to_string())
}

async fn room_booking_completion(repo: InMemoryRequestRepository) -> anyhow::Result<String> {
    let mut request = repo
        .create(draft("Seminar room for thesis defense", "room_booking", Role::Faculty))
        .await
        .context("create room booking")?;
    for (step_index, department) in
        [Department::Facilities, Department::It, Department::AcademicAffairs].into_iter().enumerate()
    {
        request = repo
            .apply_decision(&request.id, DecisionCommand::approve(step_index), &staff(department))
            .await
            .with_context(|| format!("{department} approval"))?;
    }

    ensure!(request.status == RequestStatus::Approved, "expected approved, got {}", request.status);
    ensure!(request.current_step == request.steps.len(), "cursor did not move past the last step");
    Ok("room booking completes after three approvals".to_string())
}

async fn equipment_rejection(repo: InMemoryRequestRepository) -> anyhow::Result<String> {
    let request = repo
        .create(draft("Replacement projector", "equipment_request", Role::Staff))
        .await
        .context("create equipment request")?;
    let request = repo
        .apply_decision(
            &request.id,
            DecisionCommand::reject(0).with_notes("No budget this term"),
            &staff(Department::Finance),
        )
        .await
        .context("finance rejection")?;

    ensure!(request.status == RequestStatus::Rejected, "expected rejected, got {}", request.status);
    ensure!(request.steps[1].status == StepStatus::Pending, "later step should stay pending");
    Ok("finance rejection ends the equipment request".to_string())
}

async fn rejected_request_frozen(repo: InMemoryRequestRepository) -> anyhow::Result<String> {
    let request = repo
        .create(draft("Lab centrifuge", "equipment_request", Role::Staff))
        .await
        .context("create equipment request")?;
    repo.apply_decision(&request.id, DecisionCommand::reject(0), &staff(Department::Finance))
        .await
        .context("finance rejection")?;

    let attempt = repo
        .apply_decision(&request.id, DecisionCommand::approve(1), &staff(Department::AcademicAffairs))
        .await;
    ensure!(
        matches!(attempt, Err(RepositoryError::Domain(DomainError::InvalidTransition { .. }))),
        "expected invalid transition, got {attempt:?}"
    );
    Ok("decisions on a rejected request are refused".to_string())
}

async fn department_authorization(repo: InMemoryRequestRepository) -> anyhow::Result<String> {
    let request = repo
        .create(draft("Conference room for workshop", "room_booking", Role::Faculty))
        .await
        .context("create room booking")?;

    let attempt =
        repo.apply_decision(&request.id, DecisionCommand::approve(0), &staff(Department::It)).await;
    ensure!(
        matches!(attempt, Err(RepositoryError::Domain(DomainError::Forbidden { .. }))),
        "expected forbidden, got {attempt:?}"
    );

    let unchanged = repo.find_by_id(&request.id).await.context("reload request")?;
    ensure!(unchanged == request, "forbidden decision changed the request");
    Ok("IT may not decide a Facilities step".to_string())
}

async fn seed_contract(repo: InMemoryRequestRepository) -> anyhow::Result<String> {
    let seeded = SeedDataset::load(&repo).await.context("load demo dataset")?;
    let verification = SeedDataset::verify(&repo).await.context("verify demo dataset")?;
    ensure!(verification.all_present, "seed checks failed: {:?}", verification.checks);
    Ok(format!("{} demo requests verified", seeded.requests_seeded.len()))
}

fn draft(title: &str, request_type: &str, role: Role) -> RequestDraft {
    RequestDraft::new(
        title,
        format!("{title} (smoke check)"),
        request_type,
        Requestor::new("smoke-requestor", "Smoke Requestor", "smoke@campus.edu", "Operations"),
    )
    .submitted_as(role)
}

fn staff(department: Department) -> Actor {
    Actor::new(
        format!("smoke-{}", department.as_str().to_ascii_lowercase().replace(' ', "-")),
        format!("{department} Office"),
        "office@campus.edu",
        Role::Staff,
        Some(department),
    )
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
