//! FileStacker CLI - browse and manage an organization's shared files
//!
//! Thin terminal front end over `filestacker-core`.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::GlobalArgs;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::download::run_download;
use crate::commands::list::run_list;
use crate::commands::open::run_open;
use crate::commands::rename::run_rename;
use crate::commands::settings::run_settings;
use crate::commands::show::run_show;
use crate::commands::stats::run_stats;
use crate::commands::upload::run_upload;
use crate::commands::watch::run_watch;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(()) => {}
        Err(CliError::Reported) => std::process::exit(1),
        Err(error) => {
            eprintln!("Error: {error}");
            if matches!(&error, CliError::Core(inner) if inner.is_auth_failure()) {
                eprintln!("Your session may have expired. Run `filestacker auth login`.");
            }
            std::process::exit(1);
        }
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "filestacker=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let global = GlobalArgs {
        profile: cli.profile,
        api_url: cli.api_url,
    };

    match cli.command {
        Commands::Auth { command } => run_auth(command, &global).await?,
        Commands::List { search, json } => run_list(&global, search, json).await?,
        Commands::Show { id, json } => run_show(&global, &id, json).await?,
        Commands::Upload { paths } => run_upload(&global, &paths).await?,
        Commands::Open { id } => run_open(&global, &id).await?,
        Commands::Download { id, output } => {
            run_download(&global, &id, output.as_deref()).await?;
        }
        Commands::Delete { id, yes } => run_delete(&global, &id, yes).await?,
        Commands::Rename { id, name } => run_rename(&global, &id, &name).await?,
        Commands::Watch { interval, search } => run_watch(&global, interval, search).await?,
        Commands::Stats { json } => run_stats(&global, json).await?,
        Commands::Settings { command } => run_settings(command, &global).await?,
        Commands::Config { command } => run_config(command, &global)?,
        Commands::Completions { shell, output } => {
            run_completions(shell, output.as_deref())?;
        }
    }

    Ok(())
}
