pub mod accounts;
pub mod config;
pub mod export;
pub mod report;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::error::Result;
use crate::loader::{load_workbook, Workbook};
use crate::reports::{run_pipeline, FullReport, ReportOptions};
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "custos",
    about = "Cost and managerial accounting reports from a bank-transactions workbook."
)]
pub struct Cli {
    /// Workbook to read (default: from settings, initially dados.xlsx)
    #[arg(long, global = true)]
    pub file: Option<String>,
    /// More logging on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show revenue, expense and client-cost reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Write the report tables to CSV files.
    Export {
        /// Directory for receita.csv, despesas.csv and clientes.csv (default: current directory)
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
    },
    /// List the chart of accounts loaded from the workbook.
    Accounts,
    /// Show or update saved settings.
    Config {
        /// Default workbook path
        #[arg(long)]
        workbook: Option<String>,
        /// Account-code prefix of the revenue shown in the monthly revenue report
        #[arg(long = "revenue-prefix")]
        revenue_prefix: Option<String>,
        /// Number of clients in the revenue vs. cost chart
        #[arg(long = "top-clients")]
        top_clients: Option<usize>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ReportCommands {
    /// Monthly revenue, billed one month after it is recognized.
    Revenue {
        #[command(flatten)]
        output: ReportOutputArgs,
    },
    /// Monthly expenses by account category.
    Expenses {
        #[command(flatten)]
        output: ReportOutputArgs,
    },
    /// Estimated cost and margin per client.
    Clients {
        #[command(flatten)]
        output: ReportOutputArgs,
    },
    /// All three reports.
    All {
        #[command(flatten)]
        output: ReportOutputArgs,
    },
}

impl ReportCommands {
    pub fn output_args(&self) -> &ReportOutputArgs {
        match self {
            Self::Revenue { output }
            | Self::Expenses { output }
            | Self::Clients { output }
            | Self::All { output } => output,
        }
    }
}

#[derive(Args, Clone, Default)]
pub struct ReportOutputArgs {
    /// Output mode (default: view on a terminal, text otherwise)
    #[arg(long, value_enum)]
    pub mode: Option<OutputMode>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputMode {
    View,
    Text,
    Json,
}

/// Everything a command needs to locate and analyze the workbook.
pub struct Context {
    pub workbook: PathBuf,
    pub options: ReportOptions,
}

impl Context {
    pub fn new(settings: &Settings, file: Option<&str>) -> Self {
        Self {
            workbook: PathBuf::from(file.unwrap_or(&settings.workbook)),
            options: settings.report_options(),
        }
    }

    pub fn load(&self) -> Result<Workbook> {
        load_workbook(&self.workbook)
    }

    pub fn run(&self) -> Result<FullReport> {
        let workbook = self.load()?;
        run_pipeline(&workbook, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_report_mode() {
        let cli = Cli::try_parse_from(["custos", "report", "clients", "--mode", "json"]).unwrap();
        match cli.command {
            Some(Commands::Report { command }) => {
                assert!(matches!(command, ReportCommands::Clients { .. }));
                assert_eq!(command.output_args().mode, Some(OutputMode::Json));
            }
            _ => panic!("expected report command"),
        }
    }

    #[test]
    fn test_cli_global_file_after_subcommand() {
        let cli = Cli::try_parse_from(["custos", "accounts", "--file", "outro.xlsx", "-vv"]).unwrap();
        assert_eq!(cli.file.as_deref(), Some("outro.xlsx"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_without_command_is_dashboard() {
        let cli = Cli::try_parse_from(["custos"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_context_file_overrides_settings() {
        let settings = Settings::default();
        assert_eq!(Context::new(&settings, None).workbook, PathBuf::from("dados.xlsx"));
        assert_eq!(
            Context::new(&settings, Some("x.xlsx")).workbook,
            PathBuf::from("x.xlsx")
        );
    }
}
