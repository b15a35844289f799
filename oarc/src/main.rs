mod cli;
mod commands;
mod error;
mod util;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> miette::Result<()> {
    let cli = Cli::parse_from(wild::args_os());

    let default_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Identify(args) => commands::identify(args)?,
        Commands::List(args) => commands::list(args)?,
        Commands::Cat(args) => commands::cat(args)?,
        Commands::Extract(args) => commands::extract(args)?,
        Commands::Create(args) => commands::create(args)?,
        Commands::Append(args) => commands::append(args)?,
        Commands::Formats => commands::formats()?,
    };

    Ok(())
}
