use crate::error::{Result, TallyError};

/// Format cents as a dollar amount with thousands separators: $1,234.56
pub fn money(cents: i64) -> String {
    let negative = cents < 0;
    let abs = cents.unsigned_abs();
    let int_part = (abs / 100).to_string();
    let dec_part = abs % 100;

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part:02}")
    } else {
        format!("${with_commas}.{dec_part:02}")
    }
}

/// Parse a user-entered amount ("1,234.5", "$12", "(40.00)", "-3.99") into cents.
pub fn parse_money(raw: &str) -> Result<i64> {
    let invalid = || TallyError::InvalidAmount(raw.to_string());
    let s = raw.replace([',', '$'], "");
    let s = s.trim();
    let (negative, s) = if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        (true, inner.trim())
    } else if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else {
        (false, s.strip_prefix('+').unwrap_or(s))
    };

    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(invalid());
    }
    if frac.len() > 2 || !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| invalid())? };
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
        _ => frac.parse().map_err(|_| invalid())?,
    };
    let cents = whole
        .checked_mul(100)
        .and_then(|w| w.checked_add(frac))
        .ok_or_else(invalid)?;
    Ok(if negative { -cents } else { cents })
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
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

/// Color a signed amount: green for inflows, red for outflows.
pub fn signed_money(cents: i64) -> String {
    use colored::Colorize;
    if cents < 0 {
        money(cents).red().to_string()
    } else {
        money(cents).green().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(123456), "$1,234.56");
        assert_eq!(money(-50000), "-$500.00");
        assert_eq!(money(0), "$0.00");
        assert_eq!(money(100000099), "$1,000,000.99");
        assert_eq!(money(4210), "$42.10");
        assert_eq!(money(-5), "-$0.05");
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("12.34").unwrap(), 1234);
        assert_eq!(parse_money("1,000.5").unwrap(), 100050);
        assert_eq!(parse_money("$7").unwrap(), 700);
        assert_eq!(parse_money("-3.99").unwrap(), -399);
        assert_eq!(parse_money("(40.00)").unwrap(), -4000);
        assert_eq!(parse_money(".5").unwrap(), 50);
    }

    #[test]
    fn test_parse_money_rejects_garbage() {
        for bad in ["", "abc", "1.234", "1.2.3", "--5", "."] {
            assert!(parse_money(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
