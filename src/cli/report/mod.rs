pub mod text;
pub mod view;

use std::io::IsTerminal;

use tracing::debug;

use crate::cli::{Context, OutputMode};
use crate::error::Result;
use crate::reports::FullReport;

use super::ReportCommands;

pub const REVENUE_TITLE: &str = "\u{1f4b0} Receita Bruta Mensal (com defasagem de 1 mês)";
pub const EXPENSES_TITLE: &str = "\u{1f4b8} Despesas Mensais por Competência";
pub const CLIENTS_TITLE: &str = "\u{1f4e6} Custo Estimado por Contrato/Cliente";

/// One of the three report sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Revenue,
    Expenses,
    Clients,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Revenue, Section::Expenses, Section::Clients];

    pub fn title(self) -> &'static str {
        match self {
            Self::Revenue => REVENUE_TITLE,
            Self::Expenses => EXPENSES_TITLE,
            Self::Clients => CLIENTS_TITLE,
        }
    }

    pub fn tab_label(self) -> &'static str {
        match self {
            Self::Revenue => "Receita",
            Self::Expenses => "Despesas",
            Self::Clients => "Clientes",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::Revenue => 0,
            Self::Expenses => 1,
            Self::Clients => 2,
        }
    }
}

impl ReportCommands {
    /// `None` selects every section.
    pub fn section(&self) -> Option<Section> {
        match self {
            Self::Revenue { .. } => Some(Section::Revenue),
            Self::Expenses { .. } => Some(Section::Expenses),
            Self::Clients { .. } => Some(Section::Clients),
            Self::All { .. } => None,
        }
    }
}

pub fn dispatch(cmd: ReportCommands, ctx: &Context) -> Result<()> {
    let mode = cmd.output_args().mode.unwrap_or_else(|| {
        if std::io::stdout().is_terminal() {
            OutputMode::View
        } else {
            OutputMode::Text
        }
    });
    debug!("Report mode {mode:?}");

    // Every stage finishes before anything is printed.
    let report = ctx.run()?;
    let section = cmd.section();
    let top = ctx.options.top_clients;

    match mode {
        OutputMode::View => view::dispatch(section, report, top),
        OutputMode::Text => {
            println!("{}", text::format_report(section, &report, top));
            Ok(())
        }
        OutputMode::Json => {
            println!("{}", to_json(section, &report)?);
            Ok(())
        }
    }
}

pub(crate) fn to_json(section: Option<Section>, report: &FullReport) -> Result<String> {
    let json = match section {
        Some(Section::Revenue) => serde_json::to_string_pretty(&report.revenue)?,
        Some(Section::Expenses) => serde_json::to_string_pretty(&report.expenses)?,
        Some(Section::Clients) => serde_json::to_string_pretty(&report.clients)?,
        None => serde_json::to_string_pretty(report)?,
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::tests::sample_workbook;
    use crate::reports::{run_pipeline, ReportOptions};

    #[test]
    fn test_json_for_single_section() {
        let report = run_pipeline(&sample_workbook(), &ReportOptions::default()).unwrap();
        let json = to_json(Some(Section::Revenue), &report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["billed"][0]["month"], "2023-02");
        assert_eq!(value["billed"][0]["total"], 1500.0);
        assert!(value.get("clients").is_none());
    }

    #[test]
    fn test_json_for_all_sections() {
        let report = run_pipeline(&sample_workbook(), &ReportOptions::default()).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&to_json(None, &report).unwrap()).unwrap();
        assert_eq!(value["clients"]["total_expenses"], 800.0);
        assert_eq!(value["expenses"]["categories"][0], "ALUGUEL");
    }

    #[test]
    fn test_section_order() {
        let idx: Vec<usize> = Section::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(idx, vec![0, 1, 2]);
    }
}
