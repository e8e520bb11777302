use std::path::{Path, PathBuf};

use tracing::info;

use crate::cli::Context;
use crate::error::Result;
use crate::reports::{ClientCostReport, ExpensePivot, FullReport, RevenueReport};

pub const REVENUE_FILE: &str = "receita.csv";
pub const EXPENSES_FILE: &str = "despesas.csv";
pub const CLIENTS_FILE: &str = "clientes.csv";

pub fn run(ctx: &Context, output_dir: Option<String>) -> Result<()> {
    let report = ctx.run()?;
    let dir = output_dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    for path in write_all(&report, &dir)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

/// Write the three report tables as CSV into `dir`. Returns the written paths.
pub fn write_all(report: &FullReport, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let paths = vec![
        write_revenue(&report.revenue, &dir.join(REVENUE_FILE))?,
        write_expenses(&report.expenses, &dir.join(EXPENSES_FILE))?,
        write_clients(&report.clients, &dir.join(CLIENTS_FILE))?,
    ];
    info!("Exported {} files to {}", paths.len(), dir.display());
    Ok(paths)
}

fn write_revenue(revenue: &RevenueReport, path: &Path) -> Result<PathBuf> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["mes", "receita"])?;
    for b in &revenue.billed {
        wtr.write_record([b.month.iso(), b.total.to_string()])?;
    }
    wtr.flush()?;
    Ok(path.to_path_buf())
}

fn write_expenses(pivot: &ExpensePivot, path: &Path) -> Result<PathBuf> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = vec!["mes".to_string()];
    header.extend(pivot.categories.iter().cloned());
    wtr.write_record(&header)?;
    for (month, values) in pivot.months.iter().zip(pivot.values.iter()) {
        let mut record = vec![month.iso()];
        record.extend(values.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(path.to_path_buf())
}

fn write_clients(clients: &ClientCostReport, path: &Path) -> Result<PathBuf> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["cliente", "receita_total", "custo_estimado", "margem_estimada"])?;
    for c in &clients.clients {
        wtr.write_record([
            c.client.clone(),
            c.revenue.to_string(),
            c.cost.to_string(),
            c.margin.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(path.to_path_buf())
}
