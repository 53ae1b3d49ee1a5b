//! Realm development tools.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use realm_tools::validate::{validate_data_directory, validate_scenario, ValidationError};

#[derive(Parser)]
#[command(name = "realm-tools")]
#[command(about = "Development tools for realm content")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Catalog file or directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,

        /// Scenario files to check against the catalog
        #[arg(short, long)]
        scenario: Vec<PathBuf>,
    },
}

fn print_problems(error: &ValidationError) {
    tracing::error!("{error}");
    if let ValidationError::Failed(problems) = error {
        for problem in problems {
            println!("{problem}");
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path, scenario } => {
            tracing::info!("Validating data files in: {}", path.display());
            let catalog = match validate_data_directory(&path) {
                Ok(report) => {
                    tracing::info!(
                        files = report.files.len(),
                        factions = report.counts.factions,
                        units = report.counts.units,
                        infrastructure = report.counts.infrastructure,
                        "Catalog passed"
                    );
                    report.catalog
                }
                Err(e) => {
                    print_problems(&e);
                    return ExitCode::FAILURE;
                }
            };

            let mut failed = false;
            for file in &scenario {
                if let Err(e) = validate_scenario(&catalog, file) {
                    print_problems(&e);
                    failed = true;
                }
            }
            if failed {
                return ExitCode::FAILURE;
            }
            tracing::info!("Validation passed");
            ExitCode::SUCCESS
        }
    }
}
