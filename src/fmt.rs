/// Format a float as Brazilian reais with thousands separators: R$ 1.234,56
///
/// Negative amounts get a leading minus: -R$ 1.234,56
pub fn brl(val: f64) -> String {
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_dots = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_dots.push('.');
        }
        with_dots.push(c);
    }
    let with_dots: String = with_dots.chars().rev().collect();

    // Rounds to zero: no sign, so -0.001 does not print as "-R$ 0,00".
    if val < 0.0 && cents != "0.00" {
        format!("-R$ {with_dots},{dec_part}")
    } else {
        format!("R$ {with_dots},{dec_part}")
    }
}

/// Compact axis label: "R$ 12k", "R$ 2,5k", "R$ 1M".
pub fn brl_compact(val: f64) -> String {
    // Scale is chosen after rounding, so 999.96 reads "R$ 1k" and not "R$ 1000,0".
    let round1 = |v: f64| (v * 10.0).round() / 10.0;
    let (mut scaled, mut suffix) = (round1(val), "");
    for (div, next) in [(1000.0, "k"), (1_000_000.0, "M")] {
        if scaled.abs() < 1000.0 {
            break;
        }
        scaled = round1(val / div);
        suffix = next;
    }
    if scaled == scaled.trunc() {
        format!("R$ {}{suffix}", scaled as i64)
    } else {
        format!("R$ {}{suffix}", format!("{scaled:.1}").replace('.', ","))
    }
}
