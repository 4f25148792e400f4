pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use campusflow_core::config::{ConfigOverrides, LoadOptions};
use clap::{Parser, Subcommand};

use crate::commands::dashboard::DashboardArgs;

#[derive(Debug, Parser)]
#[command(
    name = "campusflow",
    about = "CampusFlow approval workflow CLI",
    long_about = "Operate the CampusFlow request approval engine: startup preflight, demo data, smoke checks, config inspection, and dashboards.",
    after_help = "Examples:\n  campusflow start --seed-demo-data\n  campusflow smoke\n  campusflow dashboard --role staff --department Facilities"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Build the workflow runtime from config and return structured status output")]
    Start {
        #[arg(long, help = "Config file to load instead of the default search paths")]
        config: Option<PathBuf>,
        #[arg(long, help = "Load the demo requests regardless of seed.demo_data")]
        seed_demo_data: bool,
        #[arg(long, help = "Disable the faculty sponsor override for first steps")]
        no_faculty_override: bool,
    },
    #[command(about = "Load and verify the deterministic demo requests")]
    Seed,
    #[command(about = "Run the core approval scenarios with per-check timing details")]
    Smoke,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Show the dashboard an actor would see over the demo requests")]
    Dashboard {
        #[arg(long, default_value = "demo-actor")]
        id: String,
        #[arg(long, default_value = "Demo Actor")]
        name: String,
        #[arg(long, help = "admin, faculty, student, or staff")]
        role: String,
        #[arg(long)]
        department: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Start { config, seed_demo_data, no_faculty_override } => {
            commands::start::run(LoadOptions {
                require_file: config.is_some(),
                config_path: config,
                overrides: ConfigOverrides {
                    faculty_override: no_faculty_override.then_some(false),
                    seed_demo_data: seed_demo_data.then_some(true),
                    ..ConfigOverrides::default()
                },
            })
        }
        Command::Seed => commands::seed::run(),
        Command::Smoke => commands::smoke::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Dashboard { id, name, role, department } => {
            commands::dashboard::run(DashboardArgs { actor_id: id, name, role, department })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
