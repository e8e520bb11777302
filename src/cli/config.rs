use colored::Colorize;

use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path, Settings};

/// Show the saved settings, applying and saving any given overrides first.
pub fn run(
    workbook: Option<String>,
    revenue_prefix: Option<String>,
    top_clients: Option<usize>,
) -> Result<()> {
    let mut settings = load_settings();
    if apply(&mut settings, workbook, revenue_prefix, top_clients) {
        save_settings(&settings)?;
        println!("{}", "Settings saved.".green());
    }
    println!("{}", settings_path().display().to_string().bold());
    println!("  workbook:       {}", settings.workbook);
    println!("  revenue_prefix: {}", settings.revenue_prefix);
    println!("  top_clients:    {}", settings.top_clients);
    Ok(())
}

/// Returns whether anything changed.
fn apply(
    settings: &mut Settings,
    workbook: Option<String>,
    revenue_prefix: Option<String>,
    top_clients: Option<usize>,
) -> bool {
    let mut changed = false;
    if let Some(w) = workbook {
        settings.workbook = w;
        changed = true;
    }
    if let Some(p) = revenue_prefix {
        settings.revenue_prefix = p.trim().to_string();
        changed = true;
    }
    if let Some(n) = top_clients {
        settings.top_clients = n;
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_without_flags_changes_nothing() {
        let mut s = Settings::default();
        assert!(!apply(&mut s, None, None, None));
        assert_eq!(s.top_clients, 20);
    }

    #[test]
    fn test_apply_overrides_given_fields() {
        let mut s = Settings::default();
        assert!(apply(&mut s, None, Some(" 1110 ".into()), Some(5)));
        assert_eq!(s.workbook, "dados.xlsx");
        assert_eq!(s.revenue_prefix, "1110");
        assert_eq!(s.top_clients, 5);
    }
}
