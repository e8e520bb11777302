use std::collections::HashMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};
use tracing::warn;

const MONTH_ABBREVIATIONS: &[&str] = &[
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

// ---------------------------------------------------------------------------
// Month
// ---------------------------------------------------------------------------

/// A calendar month. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    #[cfg(test)]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The following calendar month (Dec/2023 -> Jan/2024).
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Display label such as "Jan/2023".
    pub fn label(&self) -> String {
        format!("{}/{}", MONTH_ABBREVIATIONS[(self.month - 1) as usize], self.year)
    }

    /// Sortable key such as "2023-01".
    pub fn iso(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.iso())
    }
}

// ---------------------------------------------------------------------------
// Account codes
// ---------------------------------------------------------------------------

/// A chart-of-accounts code ("Natureza" / "Codigo"), normalized once at
/// ingestion so both sides of a join compare the same text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountCode(String);

impl AccountCode {
    pub fn from_text(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            None
        } else {
            Some(Self(s.to_string()))
        }
    }

    /// Integral floats lose their fraction (111010.0 -> "111010"); anything
    /// else keeps its shortest decimal form (220500.1 -> "220500.1").
    pub fn from_number(n: f64) -> Option<Self> {
        if !n.is_finite() {
            return None;
        }
        if n.fract() == 0.0 && n.abs() < 1e15 {
            Some(Self(format!("{}", n as i64)))
        } else {
            Some(Self(format!("{n}")))
        }
    }

    /// Portion before the first '.', used to fold sub-accounts into their parent.
    pub fn base(&self) -> AccountCode {
        match self.0.split_once('.') {
            Some((head, _)) => Self(head.to_string()),
            None => self.clone(),
        }
    }

    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Sheet records
// ---------------------------------------------------------------------------

/// One row of the "Movimentacao Bancaria" sheet.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub date: Option<NaiveDate>,
    pub inflow: Option<f64>,
    /// `None` when empty or not a number.
    pub outflow: Option<f64>,
    pub code: Option<AccountCode>,
    pub counterparty: Option<String>,
}

/// One row of the "Plano de Contas" sheet.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub code: AccountCode,
    pub description: Option<String>,
    /// Remaining non-empty columns, in sheet order: (header, value).
    pub metadata: Vec<(String, String)>,
}

/// Chart of accounts keyed by code.
#[derive(Debug, Clone, Default)]
pub struct AccountPlan {
    entries: Vec<PlanEntry>,
    index: HashMap<AccountCode, usize>,
}

impl AccountPlan {
    /// The first entry for a code wins; later duplicates are dropped.
    pub fn from_entries(entries: Vec<PlanEntry>) -> Self {
        let mut kept = Vec::with_capacity(entries.len());
        let mut index = HashMap::new();
        for entry in entries {
            if index.contains_key(&entry.code) {
                warn!("Duplicate account code {} in chart of accounts; keeping the first", entry.code);
                continue;
            }
            index.insert(entry.code.clone(), kept.len());
            kept.push(entry);
        }
        Self { entries: kept, index }
    }

    pub fn get(&self, code: &AccountCode) -> Option<&PlanEntry> {
        self.index.get(code).map(|&i| &self.entries[i])
    }

    /// Description of the matching entry, if the entry exists and has one.
    pub fn description(&self, code: &AccountCode) -> Option<&str> {
        self.get(code).and_then(|e| e.description.as_deref())
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, description: Option<&str>) -> PlanEntry {
        PlanEntry {
            code: AccountCode::from_text(code).unwrap(),
            description: description.map(String::from),
            metadata: vec![],
        }
    }

    #[test]
    fn test_month_succ_wraps_year() {
        let dec = Month::new(2023, 12).unwrap();
        assert_eq!(dec.succ(), Month::new(2024, 1).unwrap());
        let jan = Month::new(2023, 1).unwrap();
        assert_eq!(jan.succ(), Month::new(2023, 2).unwrap());
    }

    #[test]
    fn test_month_label() {
        assert_eq!(Month::new(2023, 1).unwrap().label(), "Jan/2023");
        assert_eq!(Month::new(2024, 9).unwrap().to_string(), "Sep/2024");
        assert!(Month::new(2023, 13).is_none());
        assert!(Month::new(2023, 0).is_none());
    }

    #[test]
    fn test_month_orders_chronologically() {
        let apr = Month::new(2023, 4).unwrap();
        let jan = Month::new(2023, 1).unwrap();
        let dec_prev = Month::new(2022, 12).unwrap();
        let mut months = vec![apr, jan, dec_prev];
        months.sort();
        assert_eq!(months, vec![dec_prev, jan, apr]);
    }

    #[test]
    fn test_month_serializes_as_iso() {
        let m = Month::new(2023, 2).unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"2023-02\"");
    }

    #[test]
    fn test_account_code_from_number() {
        assert_eq!(AccountCode::from_number(111010.0).unwrap().as_str(), "111010");
        assert_eq!(AccountCode::from_number(220500.1).unwrap().as_str(), "220500.1");
        assert!(AccountCode::from_number(f64::NAN).is_none());
    }

    #[test]
    fn test_account_code_from_text_trims() {
        assert_eq!(AccountCode::from_text("  111010 ").unwrap().as_str(), "111010");
        assert!(AccountCode::from_text("   ").is_none());
    }

    #[test]
    fn test_account_code_base() {
        let code = AccountCode::from_text("220500.1").unwrap();
        assert_eq!(code.base().as_str(), "220500");
        let plain = AccountCode::from_text("220500").unwrap();
        assert_eq!(plain.base(), plain);
    }

    #[test]
    fn test_plan_first_duplicate_wins() {
        let plan = AccountPlan::from_entries(vec![
            entry("111010", Some("MARKETING DIRETO")),
            entry("111010", Some("OUTRA")),
            entry("220500", None),
        ]);
        assert_eq!(plan.len(), 2);
        let code = AccountCode::from_text("111010").unwrap();
        assert_eq!(plan.description(&code), Some("MARKETING DIRETO"));
        let undescribed = AccountCode::from_text("220500").unwrap();
        assert!(plan.get(&undescribed).is_some());
        assert_eq!(plan.description(&undescribed), None);
    }
}
