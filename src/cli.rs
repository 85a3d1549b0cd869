use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ecdeploy")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Reconcile deployment files against the control plane", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Control plane API endpoint
    #[arg(long, env = "EC_API_ENDPOINT", global = true)]
    pub api_endpoint: Option<String>,

    /// API key sent with every request
    #[arg(long, env = "EC_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Seconds to wait for a change to settle
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the flattened state of a deployment
    Show(ShowArgs),

    /// Show what applying a desired-state file would change
    Plan(PlanArgs),

    /// Create or update a deployment from a desired-state file
    Apply(ApplyArgs),

    /// Shut a deployment down and wait until it is gone
    Destroy {
        /// Deployment id
        id: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Deployment id
    pub id: String,

    /// Print the flat state as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct PlanArgs {
    /// Desired-state TOML file
    pub file: PathBuf,

    /// Existing deployment to plan against (omit to plan a create)
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Desired-state TOML file
    pub file: PathBuf,

    /// Existing deployment to update (omit to create a new one)
    #[arg(long)]
    pub id: Option<String>,

    /// Show the plan without submitting anything
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "ecdeploy",
            "-vv",
            "apply",
            "search.toml",
            "--id",
            "abc",
            "--dry-run",
            "--timeout",
            "60",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.timeout, Some(60));
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.file, PathBuf::from("search.toml"));
                assert_eq!(args.id.as_deref(), Some("abc"));
                assert!(args.dry_run);
            }
            _ => panic!("expected apply"),
        }
    }

    #[test]
    fn test_plan_without_id_is_create() {
        let cli = Cli::try_parse_from(["ecdeploy", "plan", "search.toml"]).unwrap();
        match cli.command {
            Command::Plan(args) => assert!(args.id.is_none()),
            _ => panic!("expected plan"),
        }
    }
}
