use campusflow_core::config::LoadOptions;
use campusflow_core::domain::{Actor, Department, Role};
use campusflow_core::errors::{ApplicationError, InterfaceError};
use campusflow_core::flows::{ApprovalStateMachine, CampusSequencer};
use campusflow_db::{InMemoryRequestRepository, RequestRepository, SeedDataset};

use crate::commands::{build_runtime, load_config, CommandResult};

#[derive(Clone, Debug, Default)]
pub struct DashboardArgs {
    pub actor_id: String,
    pub name: String,
    pub role: String,
    pub department: Option<String>,
}

/// Renders the dashboard an actor would see over the demo dataset.
pub fn run(args: DashboardArgs) -> CommandResult {
    let actor = match actor_from_args(&args) {
        Ok(actor) => actor,
        Err(message) => return CommandResult::failure("dashboard", "bad_request", message, 7),
    };

    let config = match load_config("dashboard", LoadOptions::default()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let runtime = match build_runtime("dashboard") {
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
        SeedDataset::load_at(&repo, &clock).await?;
        repo.dashboard(&actor).await
    });

    match result {
        Ok(summary) => {
            let message = format!(
                "{} sees {} requests ({} pending, {} in progress, {} approved, {} rejected)",
                actor.name,
                summary.counts.total,
                summary.counts.pending,
                summary.counts.in_progress,
                summary.counts.approved,
                summary.counts.rejected,
            );
            match serde_json::to_value(&summary) {
                Ok(data) => CommandResult::success_with_data("dashboard", message, data),
                Err(error) => CommandResult::failure("dashboard", "serialization", error.to_string(), 1),
            }
        }
        Err(error) => {
            let error = ApplicationError::from(error).into_interface(format!("dashboard-{}", actor.id));
            let (error_class, exit_code) = interface_error_class(&error);
            CommandResult::failure(
                "dashboard",
                error_class,
                format!("{} ({error})", error.user_message()),
                exit_code,
            )
        }
    }
}

fn actor_from_args(args: &DashboardArgs) -> Result<Actor, String> {
    let role = Role::parse(&args.role).ok_or_else(|| {
        format!("unknown role `{}` (expected admin|faculty|student|staff)", args.role)
    })?;
    let department = match args.department.as_deref() {
        Some(raw) => Some(
            Department::parse(raw).ok_or_else(|| format!("unknown department `{raw}`"))?,
        ),
        None => None,
    };
    Ok(Actor::new(args.actor_id.clone(), args.name.clone(), "", role, department))
}

fn interface_error_class(error: &InterfaceError) -> (&'static str, u8) {
    match error {
        InterfaceError::BadRequest { .. } => ("bad_request", 7),
        InterfaceError::Forbidden { .. } => ("forbidden", 7),
        InterfaceError::NotFound { .. } => ("not_found", 7),
        InterfaceError::Conflict { .. } => ("conflict", 8),
        InterfaceError::Internal { .. } => ("internal", 1),
    }
}
