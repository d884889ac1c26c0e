//! Lorchestra CLI: the `lorchestra` command.

mod cli;
mod commands;
mod config;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing();

    match cli.command {
        Commands::Callables { json } => commands::callables::run(json),

        Commands::Dispatch { name, params, json } => commands::dispatch::run(name, params, json),

        Commands::Plan {
            name,
            correlation_id,
            method,
            params,
        } => commands::plan::run(cli.config, name, correlation_id, method, params),

        Commands::Run {
            name,
            correlation_id,
            job_id,
            run_id,
            step_id,
            method,
            params,
            wal,
            json,
        } => commands::run::run(commands::run::Args {
            config: cli.config,
            name,
            correlation_id,
            job_id,
            run_id,
            step_id,
            method,
            params,
            wal,
            json,
        }),

        Commands::Key { item, method, json } => commands::key::run(item, method, json),
    }
}
