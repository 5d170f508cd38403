use crate::models::TransactionKind;

/// Format a float as an amount with thousands separators: 1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative && cents != "0.00" {
        format!("-{with_commas}.{dec_part}")
    } else {
        format!("{with_commas}.{dec_part}")
    }
}

/// Amount with a leading sign taken from the transaction kind: +1,500.50 / -89.99
pub fn signed_money(kind: TransactionKind, amount: f64) -> String {
    match kind {
        TransactionKind::Income => format!("+{}", money(amount)),
        TransactionKind::Expense => format!("-{}", money(amount)),
    }
}

/// Human-readable file size.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1234.56), "1,234.56");
        assert_eq!(money(-500.00), "-500.00");
        assert_eq!(money(0.0), "0.00");
        assert_eq!(money(1000000.99), "1,000,000.99");
        assert_eq!(money(1500.5), "1,500.50");
        assert_eq!(money(-0.001), "0.00");
    }

    #[test]
    fn test_signed_money() {
        assert_eq!(signed_money(TransactionKind::Income, 1500.5), "+1,500.50");
        assert_eq!(signed_money(TransactionKind::Expense, 89.99), "-89.99");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
