mod cli;
mod error;
mod fmt;
mod loader;
mod models;
mod reports;
mod settings;
mod tui;

use std::io::IsTerminal;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, Context, ReportCommands};

fn init_logging(verbose: u8, no_color: bool) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_ansi(!no_color && std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.no_color);
    if cli.no_color {
        colored::control::set_override(false);
    }

    let settings = settings::load_settings();
    let ctx = Context::new(&settings, cli.file.as_deref());
    debug!("Workbook {}", ctx.workbook.display());

    let result = match cli.command {
        None => cli::report::dispatch(
            ReportCommands::All {
                output: Default::default(),
            },
            &ctx,
        ),
        Some(Commands::Report { command }) => cli::report::dispatch(command, &ctx),
        Some(Commands::Export { output_dir }) => cli::export::run(&ctx, output_dir),
        Some(Commands::Accounts) => cli::accounts::list(&ctx),
        Some(Commands::Config {
            workbook,
            revenue_prefix,
            top_clients,
        }) => cli::config::run(workbook, revenue_prefix, top_clients),
    };

    if let Err(e) = result {
        debug!("{e:?}");
        eprintln!("{}", e.user_message(&ctx.workbook));
        std::process::exit(1);
    }
}
