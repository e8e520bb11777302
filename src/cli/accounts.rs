use comfy_table::{Cell, Table};

use crate::cli::Context;
use crate::error::Result;
use crate::models::AccountPlan;

pub fn list(ctx: &Context) -> Result<()> {
    let workbook = ctx.load()?;
    println!("{}", format_plan(&workbook.plan));
    Ok(())
}

pub(crate) fn format_plan(plan: &AccountPlan) -> String {
    if plan.is_empty() {
        return "Plano de Contas vazio.".to_string();
    }
    let mut table = Table::new();
    table.set_header(vec!["Código", "Descrição", "Metadados"]);
    for entry in plan.entries() {
        let metadata = entry
            .metadata
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");
        table.add_row(vec![
            Cell::new(entry.code.as_str()),
            Cell::new(entry.description.as_deref().unwrap_or_default()),
            Cell::new(metadata),
        ]);
    }
    format!("Plano de Contas ({} contas)\n{table}", plan.len())
}
