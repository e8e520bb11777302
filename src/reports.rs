use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CustosError, Result};
use crate::loader::Workbook;
use crate::models::{Month, Transaction};

/// Account codes starting with this prefix are marketing/advertising revenue.
pub const DEFAULT_REVENUE_PREFIX: &str = "111010";
pub const DEFAULT_TOP_CLIENTS: usize = 20;

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub revenue_prefix: String,
    pub top_clients: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            revenue_prefix: DEFAULT_REVENUE_PREFIX.to_string(),
            top_clients: DEFAULT_TOP_CLIENTS,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct FullReport {
    pub revenue: RevenueReport,
    pub expenses: ExpensePivot,
    pub clients: ClientCostReport,
}

/// Run all three analyses. Nothing is returned unless every stage succeeds.
pub fn run_pipeline(workbook: &Workbook, options: &ReportOptions) -> Result<FullReport> {
    let revenue = get_revenue(workbook, &options.revenue_prefix);
    let expenses = get_expenses(workbook);
    let clients = get_client_costs(workbook)?;
    Ok(FullReport {
        revenue,
        expenses,
        clients,
    })
}

// ---------------------------------------------------------------------------
// Monthly revenue (billed one month after it is recognized)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyAmount {
    pub month: Month,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueReport {
    /// Sum of matching inflows per month in which the service was provided.
    pub recognized: Vec<MonthlyAmount>,
    /// The same sums, reported in the following month.
    pub billed: Vec<MonthlyAmount>,
}

impl RevenueReport {
    /// Every recognized or billed month in order, with the billed amount or
    /// `None` where nothing was billed. The first month is always `None`.
    pub fn chart_series(&self) -> Vec<(Month, Option<f64>)> {
        let billed: BTreeMap<Month, f64> =
            self.billed.iter().map(|b| (b.month, b.total)).collect();
        let months: BTreeSet<Month> = self
            .recognized
            .iter()
            .map(|r| r.month)
            .chain(billed.keys().copied())
            .collect();
        months
            .into_iter()
            .map(|m| (m, billed.get(&m).copied()))
            .collect()
    }

    pub fn billed_total(&self) -> f64 {
        self.billed.iter().map(|b| b.total).sum()
    }
}

pub fn get_revenue(workbook: &Workbook, prefix: &str) -> RevenueReport {
    let mut by_month: BTreeMap<Month, f64> = BTreeMap::new();
    let mut unmatched = 0usize;

    for txn in workbook.transactions.iter() {
        let Some(inflow) = txn.inflow else { continue };
        let Some(code) = &txn.code else { continue };
        if workbook.plan.get(code).is_none() {
            unmatched += 1;
        }
        if !code.starts_with(prefix) {
            continue;
        }
        let Some(date) = txn.date else { continue };
        *by_month.entry(Month::of(date)).or_default() += inflow;
    }
    if unmatched > 0 {
        debug!("{unmatched} revenue rows have no matching chart-of-accounts entry");
    }

    let recognized: Vec<MonthlyAmount> = by_month
        .into_iter()
        .map(|(month, total)| MonthlyAmount { month, total })
        .collect();
    let billed = recognized
        .iter()
        .map(|r| MonthlyAmount {
            month: r.month.succ(),
            total: r.total,
        })
        .collect();

    info!("Revenue: {} months with prefix {prefix}", recognized.len());
    RevenueReport { recognized, billed }
}

// ---------------------------------------------------------------------------
// Monthly expenses by category
// ---------------------------------------------------------------------------

/// Month x category totals. Absent combinations are zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpensePivot {
    pub months: Vec<Month>,
    pub categories: Vec<String>,
    /// `values[month_idx][category_idx]`
    pub values: Vec<Vec<f64>>,
}

impl ExpensePivot {
    #[cfg(test)]
    pub fn get(&self, month: Month, category: &str) -> f64 {
        let Some(mi) = self.months.iter().position(|m| *m == month) else {
            return 0.0;
        };
        let Some(ci) = self.categories.iter().position(|c| c == category) else {
            return 0.0;
        };
        self.values[mi][ci]
    }

    pub fn month_total(&self, month_idx: usize) -> f64 {
        self.values.get(month_idx).map_or(0.0, |row| row.iter().sum())
    }

    pub fn category_total(&self, category_idx: usize) -> f64 {
        self.values.iter().filter_map(|row| row.get(category_idx)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

/// Rows with a strictly positive numeric outflow, paired with that outflow.
fn expense_rows(workbook: &Workbook) -> impl Iterator<Item = (&Transaction, f64)> {
    workbook
        .transactions
        .iter()
        .filter_map(|t| t.outflow.filter(|v| *v > 0.0).map(|v| (t, v)))
}

/// Total of every expense row, matched against the chart of accounts or not.
pub fn total_expenses(workbook: &Workbook) -> f64 {
    expense_rows(workbook).map(|(_, v)| v).sum()
}

pub fn get_expenses(workbook: &Workbook) -> ExpensePivot {
    let mut cells: BTreeMap<(Month, String), f64> = BTreeMap::new();
    let mut dropped = 0usize;

    for (txn, outflow) in expense_rows(workbook) {
        let description = txn
            .code
            .as_ref()
            .and_then(|code| workbook.plan.description(&code.base()));
        match (txn.date, description) {
            (Some(date), Some(desc)) => {
                *cells.entry((Month::of(date), desc.to_string())).or_default() += outflow;
            }
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!("{dropped} expense rows left out of the category pivot (no date or no account description)");
    }

    let months: Vec<Month> = cells
        .keys()
        .map(|(m, _)| *m)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let categories: Vec<String> = cells
        .keys()
        .map(|(_, c)| c.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let values = months
        .iter()
        .map(|m| {
            categories
                .iter()
                .map(|c| cells.get(&(*m, c.clone())).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    info!(
        "Expenses: {} months x {} categories",
        months.len(),
        categories.len()
    );
    ExpensePivot {
        months,
        categories,
        values,
    }
}

// ---------------------------------------------------------------------------
// Estimated cost per client
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientCost {
    pub client: String,
    pub revenue: f64,
    pub cost: f64,
    pub margin: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientCostReport {
    /// Ordered by client name.
    pub clients: Vec<ClientCost>,
    pub total_revenue: f64,
    pub total_expenses: f64,
}

impl ClientCostReport {
    /// The `n` clients with the highest revenue, highest first.
    pub fn top_by_revenue(&self, n: usize) -> Vec<&ClientCost> {
        let mut ranked: Vec<&ClientCost> = self.clients.iter().collect();
        ranked.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
        ranked.truncate(n);
        ranked
    }
}

/// Split total expenses across clients in proportion to their revenue.
///
/// Fails when there is revenue to allocate against but it sums to zero while
/// expenses do not.
pub fn get_client_costs(workbook: &Workbook) -> Result<ClientCostReport> {
    let mut by_client: BTreeMap<String, f64> = BTreeMap::new();
    for txn in workbook.transactions.iter() {
        let (Some(inflow), Some(client)) = (txn.inflow, txn.counterparty.as_ref()) else {
            continue;
        };
        *by_client.entry(client.clone()).or_default() += inflow;
    }

    let total_revenue: f64 = by_client.values().sum();
    let total_expenses = total_expenses(workbook);

    if !by_client.is_empty() && total_revenue == 0.0 && total_expenses != 0.0 {
        return Err(CustosError::Computation(format!(
            "total revenue is zero; cannot allocate {total_expenses} of expenses across {} clients",
            by_client.len()
        )));
    }

    let clients = by_client
        .into_iter()
        .map(|(client, revenue)| {
            let cost = if total_revenue == 0.0 {
                0.0
            } else {
                revenue * total_expenses / total_revenue
            };
            ClientCost {
                client,
                revenue,
                cost,
                margin: revenue - cost,
            }
        })
        .collect::<Vec<_>>();

    info!("Client costs: {} clients", clients.len());
    Ok(ClientCostReport {
        clients,
        total_revenue,
        total_expenses,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{AccountCode, AccountPlan, PlanEntry};
    use chrono::NaiveDate;

    pub(crate) fn txn(
        date: &str,
        inflow: Option<f64>,
        outflow: Option<f64>,
        code: &str,
        client: &str,
    ) -> Transaction {
        Transaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            inflow,
            outflow,
            code: AccountCode::from_text(code),
            counterparty: (!client.is_empty()).then(|| client.to_string()),
        }
    }

    pub(crate) fn plan(entries: &[(&str, &str)]) -> AccountPlan {
        AccountPlan::from_entries(
            entries
                .iter()
                .map(|(code, desc)| PlanEntry {
                    code: AccountCode::from_text(code).unwrap(),
                    description: Some(desc.to_string()),
                    metadata: vec![],
                })
                .collect(),
        )
    }

    /// Two revenue months, two expense categories, three clients.
    pub(crate) fn sample_workbook() -> Workbook {
        Workbook {
            transactions: vec![
                txn("2023-01-15", Some(1000.0), None, "111010", "ACME"),
                txn("2023-01-20", Some(500.0), None, "111010.2", "Globex"),
                txn("2023-03-02", Some(2000.0), None, "111010", "ACME"),
                txn("2023-03-05", Some(300.0), None, "999999", "Initech"),
                txn("2023-01-10", None, Some(200.0), "220500.1", "Aluguel"),
                txn("2023-03-01", None, Some(500.0), "220500", "Aluguel"),
                txn("2023-03-09", None, Some(80.0), "330100", "Software"),
                txn("2023-03-09", None, Some(20.0), "777777", "Sem conta"),
            ],
            plan: plan(&[
                ("111010", "MARKETING DIRETO"),
                ("220500", "ALUGUEL"),
                ("330100", "SOFTWARE"),
            ]),
        }
    }

    fn month(y: i32, m: u32) -> Month {
        Month::new(y, m).unwrap()
    }

    // -- revenue ------------------------------------------------------------

    #[test]
    fn test_revenue_recognized_in_january_billed_in_february() {
        let wb = Workbook {
            transactions: vec![txn("2023-01-15", Some(1000.0), None, "111010", "ACME")],
            plan: plan(&[("111010", "MARKETING DIRETO")]),
        };
        let report = get_revenue(&wb, DEFAULT_REVENUE_PREFIX);
        assert_eq!(report.recognized, vec![MonthlyAmount { month: month(2023, 1), total: 1000.0 }]);
        assert_eq!(report.billed, vec![MonthlyAmount { month: month(2023, 2), total: 1000.0 }]);
    }

    #[test]
    fn test_revenue_prefix_filter_and_grouping() {
        let report = get_revenue(&sample_workbook(), DEFAULT_REVENUE_PREFIX);
        // 111010.2 shares the prefix; 999999 does not.
        assert_eq!(
            report.recognized,
            vec![
                MonthlyAmount { month: month(2023, 1), total: 1500.0 },
                MonthlyAmount { month: month(2023, 3), total: 2000.0 },
            ]
        );
    }

    #[test]
    fn test_revenue_shift_is_by_calendar_month() {
        let report = get_revenue(&sample_workbook(), DEFAULT_REVENUE_PREFIX);
        for r in &report.recognized {
            let billed = report.billed.iter().find(|b| b.month == r.month.succ()).unwrap();
            assert_eq!(billed.total, r.total);
        }
        // February had no revenue, so April is billed from March, not from January.
        assert_eq!(report.billed[1], MonthlyAmount { month: month(2023, 4), total: 2000.0 });
    }

    #[test]
    fn test_revenue_chart_series_has_leading_gap() {
        let report = get_revenue(&sample_workbook(), DEFAULT_REVENUE_PREFIX);
        let series = report.chart_series();
        assert_eq!(
            series,
            vec![
                (month(2023, 1), None),
                (month(2023, 2), Some(1500.0)),
                (month(2023, 3), None),
                (month(2023, 4), Some(2000.0)),
            ]
        );
    }

    #[test]
    fn test_revenue_shift_across_year_end() {
        let wb = Workbook {
            transactions: vec![txn("2022-12-31", Some(10.0), None, "111010", "X")],
            plan: AccountPlan::default(),
        };
        let report = get_revenue(&wb, DEFAULT_REVENUE_PREFIX);
        assert_eq!(report.billed[0].month, month(2023, 1));
    }

    #[test]
    fn test_revenue_ignores_rows_without_date() {
        let wb = Workbook {
            transactions: vec![txn("", Some(10.0), None, "111010", "X")],
            plan: AccountPlan::default(),
        };
        assert!(get_revenue(&wb, DEFAULT_REVENUE_PREFIX).recognized.is_empty());
    }

    // -- expenses -----------------------------------------------------------

    #[test]
    fn test_expense_code_suffix_is_stripped_before_join() {
        let wb = Workbook {
            transactions: vec![txn("2023-03-01", None, Some(500.0), "220500.1", "Aluguel")],
            plan: plan(&[("220500", "ALUGUEL")]),
        };
        let pivot = get_expenses(&wb);
        assert_eq!(pivot.get(month(2023, 3), "ALUGUEL"), 500.0);
    }

    #[test]
    fn test_expense_pivot_fills_missing_cells_with_zero() {
        let pivot = get_expenses(&sample_workbook());
        assert_eq!(pivot.months, vec![month(2023, 1), month(2023, 3)]);
        assert_eq!(pivot.categories, vec!["ALUGUEL".to_string(), "SOFTWARE".to_string()]);
        assert_eq!(pivot.get(month(2023, 1), "ALUGUEL"), 200.0);
        assert_eq!(pivot.get(month(2023, 1), "SOFTWARE"), 0.0);
        assert_eq!(pivot.get(month(2023, 3), "SOFTWARE"), 80.0);
        assert_eq!(pivot.values[0], vec![200.0, 0.0]);
        assert_eq!(pivot.month_total(1), 580.0);
        assert_eq!(pivot.category_total(0), 700.0);
    }

    #[test]
    fn test_expense_rows_require_positive_outflow() {
        let wb = Workbook {
            transactions: vec![
                txn("2023-03-01", None, Some(0.0), "220500", ""),
                txn("2023-03-01", None, Some(-50.0), "220500", ""),
                txn("2023-03-01", None, None, "220500", ""),
                txn("2023-03-01", None, Some(10.0), "220500", ""),
            ],
            plan: plan(&[("220500", "ALUGUEL")]),
        };
        assert_eq!(get_expenses(&wb).get(month(2023, 3), "ALUGUEL"), 10.0);
        assert_eq!(total_expenses(&wb), 10.0);
    }

    #[test]
    fn test_expense_months_sort_chronologically() {
        let wb = Workbook {
            transactions: vec![
                txn("2023-04-01", None, Some(1.0), "220500", ""),
                txn("2023-01-01", None, Some(1.0), "220500", ""),
            ],
            plan: plan(&[("220500", "ALUGUEL")]),
        };
        // "Apr/2023" sorts before "Jan/2023" as text; months must not.
        assert_eq!(get_expenses(&wb).months, vec![month(2023, 1), month(2023, 4)]);
    }

    #[test]
    fn test_total_expenses_includes_unmatched_rows() {
        assert_eq!(total_expenses(&sample_workbook()), 800.0);
    }

    // -- client costs -------------------------------------------------------

    #[test]
    fn test_client_costs_proportional_split() {
        let wb = Workbook {
            transactions: vec![
                txn("2023-01-01", Some(300.0), None, "111010", "Alpha"),
                txn("2023-01-01", Some(700.0), None, "111010", "Beta"),
                txn("2023-01-01", None, Some(100.0), "220500", "Fornecedor"),
            ],
            plan: AccountPlan::default(),
        };
        let report = get_client_costs(&wb).unwrap();
        assert_eq!(report.clients.len(), 2);
        assert_eq!(report.clients[0].client, "Alpha");
        assert_eq!(report.clients[0].cost, 30.0);
        assert_eq!(report.clients[1].cost, 70.0);
        assert_eq!(report.clients[0].margin, 270.0);
        assert_eq!(report.clients[1].margin, 630.0);
    }

    #[test]
    fn test_client_costs_sum_to_total_expenses() {
        let report = get_client_costs(&sample_workbook()).unwrap();
        let allocated: f64 = report.clients.iter().map(|c| c.cost).sum();
        assert!((allocated - report.total_expenses).abs() < 1e-9);
        assert_eq!(report.total_expenses, 800.0);
        assert_eq!(report.total_revenue, 3800.0);
        for c in &report.clients {
            assert_eq!(c.margin, c.revenue - c.cost);
        }
    }

    #[test]
    fn test_client_costs_use_all_revenue_codes() {
        let report = get_client_costs(&sample_workbook()).unwrap();
        let names: Vec<&str> = report.clients.iter().map(|c| c.client.as_str()).collect();
        assert_eq!(names, vec!["ACME", "Globex", "Initech"]);
        assert_eq!(report.clients[0].revenue, 3000.0);
    }

    #[test]
    fn test_client_costs_skip_rows_without_client() {
        let wb = Workbook {
            transactions: vec![
                txn("2023-01-01", Some(50.0), None, "111010", ""),
                txn("2023-01-01", Some(100.0), None, "111010", "Alpha"),
            ],
            plan: AccountPlan::default(),
        };
        let report = get_client_costs(&wb).unwrap();
        assert_eq!(report.clients.len(), 1);
        assert_eq!(report.total_revenue, 100.0);
    }

    #[test]
    fn test_zero_revenue_with_expenses_is_computation_error() {
        let wb = Workbook {
            transactions: vec![
                txn("2023-01-01", Some(0.0), None, "111010", "Alpha"),
                txn("2023-01-01", None, Some(100.0), "220500", ""),
            ],
            plan: AccountPlan::default(),
        };
        let err = get_client_costs(&wb).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Computation);
    }

    #[test]
    fn test_zero_revenue_and_zero_expenses_allocates_nothing() {
        let wb = Workbook {
            transactions: vec![txn("2023-01-01", Some(0.0), None, "111010", "Alpha")],
            plan: AccountPlan::default(),
        };
        let report = get_client_costs(&wb).unwrap();
        assert_eq!(report.clients[0].cost, 0.0);
        assert_eq!(report.clients[0].margin, 0.0);
    }

    #[test]
    fn test_no_clients_is_not_an_error() {
        let wb = Workbook {
            transactions: vec![txn("2023-01-01", None, Some(100.0), "220500", "")],
            plan: AccountPlan::default(),
        };
        let report = get_client_costs(&wb).unwrap();
        assert!(report.clients.is_empty());
        assert_eq!(report.total_expenses, 100.0);
    }

    #[test]
    fn test_top_by_revenue() {
        let report = get_client_costs(&sample_workbook()).unwrap();
        let top = report.top_by_revenue(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].client, "ACME");
        assert_eq!(top[1].client, "Globex");
    }

    #[test]
    fn test_pipeline_fails_whole_when_one_stage_fails() {
        let wb = Workbook {
            transactions: vec![
                txn("2023-01-01", Some(0.0), None, "111010", "Alpha"),
                txn("2023-01-01", None, Some(100.0), "220500", ""),
            ],
            plan: plan(&[("220500", "ALUGUEL")]),
        };
        assert!(run_pipeline(&wb, &ReportOptions::default()).is_err());
    }
}
