mod cli;
mod commands;
mod config;
mod drift;
mod engine;
mod paths;
mod progress;
mod resource;
mod state;
#[cfg(test)]
mod testutil;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, GroupCommand};
use commands::reconcile::ApplyArgs;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
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

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };
    log::debug!("verbosity {}", ctx.verbose);

    match cli.command {
        Command::Plan(args) => commands::reconcile::plan(&ctx, args.target.as_deref()),
        Command::Apply(args) => commands::reconcile::apply(
            &ctx,
            &ApplyArgs {
                target: args.target,
                dry_run: args.dry_run,
                yes: args.yes,
                jobs: args.jobs,
                fail_fast: args.fail_fast,
                deadline_secs: args.deadline,
            },
        ),
        Command::Refresh(args) => commands::reconcile::refresh(&ctx, args.target.as_deref()),
        Command::Destroy(args) => commands::reconcile::destroy(
            &ctx,
            &ApplyArgs {
                target: args.target,
                yes: args.yes,
                ..ApplyArgs::default()
            },
        ),
        Command::Sounds => commands::lookup::sounds(&ctx),
        Command::Validate { user, device } => {
            commands::lookup::validate(&ctx, &user, device.as_deref())
        }
        Command::Receipt { receipt, cancel } => commands::lookup::receipt(&ctx, &receipt, cancel),
        Command::Group(cmd) => match cmd {
            GroupCommand::Show { group } => commands::lookup::group_show(&ctx, &group),
            GroupCommand::Rename { group, name } => {
                commands::lookup::group_rename(&ctx, &group, &name)
            }
        },
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "pushsync", &mut io::stdout());
            Ok(())
        }
    }
}
