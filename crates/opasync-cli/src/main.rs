//! opasync CLI - sync OPA rego policies from a workspace to Kubernetes ConfigMaps

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;
mod error;
mod exit_codes;
mod progress;
mod selector;
mod workspace;

use commands::sync::SyncOptions;
use error::CliError;
use workspace::{GlobalArgs, Workspace};

#[derive(Parser)]
#[command(name = "opasync")]
#[command(author = "opasync Contributors")]
#[command(version)]
#[command(about = "Sync OPA rego policies from a workspace to Kubernetes ConfigMaps", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan, select and apply policy changes
    Sync {
        /// Apply the default selection without prompting
        #[arg(short, long)]
        yes: bool,

        /// Print the plan without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the plan without changing anything
    Plan {
        /// Output the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// List policies in the namespace
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Deploy policy files, creating or overwriting their ConfigMaps
    Deploy {
        /// Policy files, relative to the workspace root
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Also overwrite policies not deployed by opasync
        #[arg(long)]
        force: bool,
    },

    /// Delete policies by name
    Delete {
        /// Policy names
        #[arg(required = true)]
        names: Vec<String>,

        /// Also delete policies not deployed by opasync
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> error::Result<()> {
    let workspace = Workspace::load(&cli.global)?;

    match cli.command {
        Commands::Sync { yes, dry_run } => {
            commands::sync::run(
                &workspace,
                SyncOptions {
                    yes,
                    dry_run,
                    json: false,
                },
            )
            .await
        }

        Commands::Plan { json } => {
            commands::sync::run(
                &workspace,
                SyncOptions {
                    yes: true,
                    dry_run: true,
                    json,
                },
            )
            .await
        }

        Commands::List { json } => commands::list::run(&workspace, json).await,

        Commands::Deploy { files, force } => {
            commands::deploy::run(&workspace, &files, force).await
        }

        Commands::Delete { names, force } => {
            commands::delete::run(&workspace, &names, force).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.global.debug);

    match run(cli).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => report(err),
    }
}

fn report(err: CliError) -> ExitCode {
    let code = err.exit_code();
    eprintln!("{:?}", miette::Report::new(err));
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args_after_subcommand() {
        let cli = Cli::try_parse_from([
            "opasync", "sync", "--yes", "-n", "policies", "--context", "dev",
        ])
        .unwrap();

        assert_eq!(cli.global.namespace.as_deref(), Some("policies"));
        assert_eq!(cli.global.context.as_deref(), Some("dev"));
        assert!(matches!(
            cli.command,
            Commands::Sync {
                yes: true,
                dry_run: false
            }
        ));
    }

    #[test]
    fn test_deploy_requires_files() {
        assert!(Cli::try_parse_from(["opasync", "deploy"]).is_err());
    }

    #[test]
    fn test_delete_force() {
        let cli = Cli::try_parse_from(["opasync", "delete", "a", "b", "--force"]).unwrap();
        match cli.command {
            Commands::Delete { names, force } => {
                assert_eq!(names, vec!["a", "b"]);
                assert!(force);
            }
            _ => panic!("expected delete"),
        }
    }
}
