//! Wharf CLI - package-repository composition from the terminal

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wharf::util::shell::Shell;

mod cli;
mod commands;

use cli::{Cli, Commands};

/// Options shared by every command.
pub struct GlobalOptions {
    pub shell: Shell,
    pub verbose: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("wharf=debug")
    } else {
        EnvFilter::new("wharf=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    let json = matches!(&cli.command, Commands::List(args) if args.json);
    let global_opts = GlobalOptions {
        shell: Shell::from_flags(cli.verbose, !cli.no_color, json),
        verbose: cli.verbose,
    };

    // Execute command
    match cli.command {
        Commands::List(args) => commands::list::execute(args, &global_opts),
        Commands::Add(args) => commands::add::execute(args, &global_opts),
        Commands::Remove(args) => commands::remove::execute(args, &global_opts),
        Commands::Restore(args) => commands::restore::execute(args, &global_opts),
        Commands::Source(args) => commands::source::execute(args, &global_opts),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
