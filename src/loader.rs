use std::path::Path;

use calamine::{Data, Range, Reader};
use chrono::{Days, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::error::{CustosError, Result};
use crate::models::{AccountCode, AccountPlan, PlanEntry, Transaction};

pub const TRANSACTIONS_SHEET: &str = "Movimentacao Bancaria";
pub const PLAN_SHEET: &str = "Plano de Contas";

static EMPTY: Data = Data::Empty;

/// Both sheets of the input workbook, typed and normalized.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub transactions: Vec<Transaction>,
    pub plan: AccountPlan,
}

pub fn load_workbook(path: &Path) -> Result<Workbook> {
    info!("Loading workbook {}", path.display());
    if !path.is_file() {
        return Err(CustosError::Load {
            path: path.to_path_buf(),
            reason: "file not found".into(),
        });
    }

    let mut workbook = calamine::open_workbook_auto(path).map_err(|e| CustosError::Load {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let names = workbook.sheet_names();
    for sheet in [TRANSACTIONS_SHEET, PLAN_SHEET] {
        if !names.iter().any(|n| n == sheet) {
            return Err(CustosError::schema(sheet, "sheet not found in workbook"));
        }
    }

    let mut read_sheet = |sheet: &str| {
        workbook
            .worksheet_range(sheet)
            .map_err(|e| CustosError::Load {
                path: path.to_path_buf(),
                reason: format!("cannot read sheet '{sheet}': {e}"),
            })
    };
    let movements = read_sheet(TRANSACTIONS_SHEET)?;
    let plan = read_sheet(PLAN_SHEET)?;

    let transactions = parse_transactions(&movements)?;
    let plan = parse_account_plan(&plan)?;
    info!(
        "Loaded {} transactions and {} chart-of-accounts entries",
        transactions.len(),
        plan.len()
    );
    Ok(Workbook { transactions, plan })
}

// ---------------------------------------------------------------------------
// Sheet parsers
// ---------------------------------------------------------------------------

pub fn parse_transactions(range: &Range<Data>) -> Result<Vec<Transaction>> {
    let sheet = TRANSACTIONS_SHEET;
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| CustosError::schema(sheet, "sheet is empty"))?;
    let idx_date = column_index(header, sheet, "Data")?;
    let idx_inflow = column_index(header, sheet, "Entrada")?;
    let idx_outflow = column_index(header, sheet, "Saida")?;
    let idx_code = column_index(header, sheet, "Natureza")?;
    let idx_counterparty = column_index(header, sheet, "Historico")?;

    let mut transactions = Vec::new();
    for (i, row) in rows.enumerate() {
        // Header is sheet row 1.
        let line = i + 2;
        if row.iter().all(is_blank) {
            continue;
        }
        let cell = |idx: usize| row.get(idx).unwrap_or(&EMPTY);

        let date = cell_date(cell(idx_date))
            .map_err(|e| CustosError::schema(sheet, format!("row {line}, column Data: {e}")))?;
        let inflow = match cell_amount(cell(idx_inflow)) {
            Amount::Null => None,
            Amount::Number(n) => Some(n),
            Amount::Invalid(raw) => {
                return Err(CustosError::schema(
                    sheet,
                    format!("row {line}, column Entrada: '{raw}' is not a number"),
                ));
            }
        };
        let outflow = match cell_amount(cell(idx_outflow)) {
            Amount::Number(n) => Some(n),
            Amount::Null => None,
            Amount::Invalid(raw) => {
                debug!("Row {line}: Saida '{raw}' is not a number, treating as empty");
                None
            }
        };

        transactions.push(Transaction {
            date,
            inflow,
            outflow,
            code: cell_code(cell(idx_code)),
            counterparty: cell_text(cell(idx_counterparty)),
        });
    }
    Ok(transactions)
}

pub fn parse_account_plan(range: &Range<Data>) -> Result<AccountPlan> {
    let sheet = PLAN_SHEET;
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| CustosError::schema(sheet, "sheet is empty"))?;
    let idx_code = column_index(header, sheet, "Codigo")?;
    let idx_desc = column_index(header, sheet, "Descricao")?;
    let extra_columns: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != idx_code && *i != idx_desc)
        .filter_map(|(i, h)| cell_text(h).map(|name| (i, name)))
        .collect();

    let mut entries = Vec::new();
    for row in rows {
        let cell = |idx: usize| row.get(idx).unwrap_or(&EMPTY);
        let Some(code) = cell_code(cell(idx_code)) else {
            continue;
        };
        let metadata = extra_columns
            .iter()
            .filter_map(|(i, name)| cell_text(cell(*i)).map(|v| (name.clone(), v)))
            .collect();
        entries.push(PlanEntry {
            code,
            description: cell_text(cell(idx_desc)),
            metadata,
        });
    }
    Ok(AccountPlan::from_entries(entries))
}

// ---------------------------------------------------------------------------
// Header lookup
// ---------------------------------------------------------------------------

/// Lowercase and strip Portuguese diacritics so "Saída" matches "Saida".
fn fold_header(raw: &str) -> String {
    raw.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn column_index(header: &[Data], sheet: &str, name: &str) -> Result<usize> {
    let wanted = fold_header(name);
    header
        .iter()
        .position(|h| cell_text(h).is_some_and(|t| fold_header(&t) == wanted))
        .ok_or_else(|| CustosError::schema(sheet, format!("missing column '{name}'")))
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(dt.as_f64().to_string()),
        Data::Error(_) | Data::Empty => None,
    }
}

fn cell_code(cell: &Data) -> Option<AccountCode> {
    match cell {
        Data::Int(i) => AccountCode::from_text(&i.to_string()),
        Data::Float(f) => AccountCode::from_number(*f),
        other => cell_text(other).and_then(|t| AccountCode::from_text(&t)),
    }
}

#[derive(Debug, PartialEq)]
enum Amount {
    Null,
    Number(f64),
    Invalid(String),
}

fn cell_amount(cell: &Data) -> Amount {
    match cell {
        Data::Empty => Amount::Null,
        Data::Int(i) => Amount::Number(*i as f64),
        Data::Float(f) if f.is_finite() => Amount::Number(*f),
        Data::String(s) => {
            let t = s.trim();
            if t.is_empty() || t == "-" {
                Amount::Null
            } else {
                parse_amount(t).map_or_else(|| Amount::Invalid(t.to_string()), Amount::Number)
            }
        }
        // Formula errors (#N/A, #DIV/0!) carry no amount.
        Data::Error(e) => {
            debug!("Amount cell holds {e:?}, treating as empty");
            Amount::Null
        }
        other => Amount::Invalid(format!("{other:?}")),
    }
}

/// Parse an amount typed as text: Brazilian notation ("R$ 1.234,56") or a
/// plain decimal ("1234.56"). Parenthesized values are negative. Anything
/// else, including US grouping such as "1,234.56", is rejected.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace("R$", "").replace(' ', "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return parse_amount(inner).map(|v| -v);
    }
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, s),
    };
    let normalized = match digits.rsplit_once(',') {
        Some((int_part, frac)) => {
            if frac.is_empty() || !frac.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            let int_digits = if int_part.contains('.') {
                thousands_groups(int_part, '.')?
            } else {
                all_digits(int_part)?.to_string()
            };
            format!("{int_digits}.{frac}")
        }
        None => {
            let (int_part, frac) = digits.split_once('.').unwrap_or((digits, "0"));
            all_digits(int_part)?;
            all_digits(frac)?;
            digits.to_string()
        }
    };
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| sign * v)
}

fn all_digits(s: &str) -> Option<&str> {
    (!s.is_empty() && s.chars().all(|c| c.is_ascii_digit())).then_some(s)
}

/// "1.234.567" -> "1234567"; the leading group has 1-3 digits, the rest exactly 3.
fn thousands_groups(s: &str, sep: char) -> Option<String> {
    let mut groups = s.split(sep);
    let first = all_digits(groups.next()?)?;
    if first.len() > 3 {
        return None;
    }
    let mut out = first.to_string();
    for g in groups {
        if g.len() != 3 {
            return None;
        }
        out.push_str(all_digits(g)?);
    }
    Some(out)
}

fn cell_date(cell: &Data) -> std::result::Result<Option<NaiveDate>, String> {
    match cell {
        Data::Empty => Ok(None),
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()).map(Some),
        Data::Float(f) => excel_serial_to_date(*f).map(Some),
        Data::Int(i) => excel_serial_to_date(*i as f64).map(Some),
        Data::String(s) | Data::DateTimeIso(s) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                parse_date_text(s)
                    .map(Some)
                    .ok_or_else(|| format!("'{s}' is not a date"))
            }
        }
        other => Err(format!("{other:?} is not a date")),
    }
}

pub fn excel_serial_to_date(serial: f64) -> std::result::Result<NaiveDate, String> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30).ok_or("invalid Excel epoch")?;
    if !serial.is_finite() || serial < 0.0 {
        return Err(format!("{serial} is not a valid Excel date"));
    }
    base.checked_add_days(Days::new(serial.floor() as u64))
        .ok_or_else(|| format!("{serial} is out of range for a date"))
}

pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}
