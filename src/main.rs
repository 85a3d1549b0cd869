mod cli;
mod commands;
mod config;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Settings;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub settings: Settings,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "ecdeploy", &mut io::stdout());
        return Ok(());
    }

    let settings = Settings::load()?.with_overrides(cli.api_endpoint, cli.api_key, cli.timeout);
    log::debug!("Using API endpoint {}", settings.api_endpoint);

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        settings,
    };

    match cli.command {
        Command::Show(args) => commands::show::run(&ctx, &args.id, args.json),
        Command::Plan(args) => commands::deploy::plan(&ctx, &args.file, args.id.as_deref()),
        Command::Apply(args) => {
            commands::deploy::apply(&ctx, &args.file, args.id.as_deref(), args.dry_run)
        }
        Command::Destroy { id } => commands::deploy::destroy(&ctx, &id),
        Command::Completions { .. } => Ok(()),
    }
}
