use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::fmt::brl;
use crate::reports::{ClientCostReport, ExpensePivot, FullReport, RevenueReport};

use super::Section;

fn money_cell(val: f64) -> Cell {
    Cell::new(brl(val)).set_alignment(CellAlignment::Right)
}

fn section_header(section: Section) -> String {
    section.title().bold().to_string()
}

// ---------------------------------------------------------------------------
// Pure formatting functions (report data → String)
// ---------------------------------------------------------------------------

pub fn format_report(section: Option<Section>, report: &FullReport, top_clients: usize) -> String {
    let sections: Vec<Section> = match section {
        Some(s) => vec![s],
        None => Section::ALL.to_vec(),
    };
    sections
        .into_iter()
        .map(|s| match s {
            Section::Revenue => format_revenue(&report.revenue),
            Section::Expenses => format_expenses(&report.expenses),
            Section::Clients => format_clients(&report.clients, top_clients),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_revenue(revenue: &RevenueReport) -> String {
    let header = section_header(Section::Revenue);
    if revenue.billed.is_empty() {
        return format!("{header}\nNenhuma receita encontrada.");
    }
    let mut table = Table::new();
    table.set_header(vec!["Mês", "Receita"]);
    for b in &revenue.billed {
        table.add_row(vec![Cell::new(b.month.label()), money_cell(b.total)]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        money_cell(revenue.billed_total()),
    ]);
    format!("{header}\nReceita por mês (faturada com defasagem de 1 mês):\n{table}")
}

pub fn format_expenses(pivot: &ExpensePivot) -> String {
    let header = section_header(Section::Expenses);
    if pivot.is_empty() {
        return format!("{header}\nNenhuma despesa classificada encontrada.");
    }
    let mut table = Table::new();
    let mut head = vec!["Mês".to_string()];
    head.extend(pivot.categories.iter().cloned());
    head.push("Total".to_string());
    table.set_header(head);

    for (i, month) in pivot.months.iter().enumerate() {
        let mut row = vec![Cell::new(month.label())];
        row.extend(pivot.values[i].iter().map(|v| money_cell(*v)));
        row.push(money_cell(pivot.month_total(i)));
        table.add_row(row);
    }
    let mut totals = vec![Cell::new("Total".bold())];
    totals.extend((0..pivot.categories.len()).map(|ci| money_cell(pivot.category_total(ci))));
    totals.push(money_cell(pivot.values.iter().flatten().sum()));
    table.add_row(totals);
    format!("{header}\nDespesas por mês e por tipo:\n{table}")
}

pub fn format_clients(clients: &ClientCostReport, top_clients: usize) -> String {
    let header = section_header(Section::Clients);
    if clients.clients.is_empty() {
        return format!("{header}\nNenhum cliente com receita encontrado.");
    }
    let mut table = Table::new();
    table.set_header(vec!["Cliente", "Receita Total", "Custo Estimado", "Margem Estimada"]);
    for c in &clients.clients {
        let margin = if c.margin < 0.0 {
            brl(c.margin).red().to_string()
        } else {
            brl(c.margin)
        };
        table.add_row(vec![
            Cell::new(&c.client),
            money_cell(c.revenue),
            money_cell(c.cost),
            Cell::new(margin).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        money_cell(clients.total_revenue),
        money_cell(clients.total_expenses),
        money_cell(clients.total_revenue - clients.total_expenses),
    ]);

    let top = clients.top_by_revenue(top_clients);
    let mut ranking = Table::new();
    ranking.set_header(vec!["#", "Cliente", "Receita Total", "Custo Estimado"]);
    for (i, c) in top.iter().enumerate() {
        ranking.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&c.client),
            money_cell(c.revenue),
            money_cell(c.cost),
        ]);
    }

    format!(
        "{header}\n{table}\n\nComparativo Receita vs. Custo dos {} principais clientes\n{ranking}",
        top.len()
    )
}
