/// Placeholder shown for undefined values.
pub const NOT_AVAILABLE: &str = "N/D";

/// Insert `sep` every three digits of an unsigned integer string.
fn group_digits(digits: &str, sep: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let offset = digits.len() % 3;
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - offset) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

/// Fixed-point with pt-BR separators: `.` for thousands, `,` for decimals.
fn pt_br(v: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, v.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let sign = if v < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{}{},{}", sign, group_digits(int_part, '.'), f),
        None => format!("{}{}", sign, group_digits(int_part, '.')),
    }
}

/// `1.234.567`
pub fn population(v: Option<f64>) -> String {
    v.map(|x| pt_br(x, 0))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `12.3%`
pub fn percent(v: Option<f64>) -> String {
    v.map(|x| format!("{:.1}%", x))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `R$ 1.234,56`
pub fn currency(v: Option<f64>) -> String {
    v.map(|x| format!("R$ {}", pt_br(x, 2)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `12.3`
pub fn one_decimal(v: Option<f64>) -> String {
    v.map(|x| format!("{:.1}", x))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `12.35`, as used in tooltips and tables.
pub fn two_decimals(v: Option<f64>) -> String {
    v.map(|x| format!("{:.2}", x))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// `0.123`, for correlation coefficients.
pub fn three_decimals(v: Option<f64>) -> String {
    v.map(|x| format!("{:.3}", x))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_grouping() {
        assert_eq!(population(Some(1234567.0)), "1.234.567");
        assert_eq!(population(Some(999.4)), "999");
        assert_eq!(population(Some(1000.0)), "1.000");
        assert_eq!(population(None), "N/D");
    }

    #[test]
    fn test_currency_uses_comma_decimals() {
        assert_eq!(currency(Some(1234.5)), "R$ 1.234,50");
        assert_eq!(currency(Some(12.0)), "R$ 12,00");
        assert_eq!(currency(Some(-1500.25)), "R$ -1.500,25");
        assert_eq!(currency(None), "N/D");
    }

    #[test]
    fn test_percent_and_decimals() {
        assert_eq!(percent(Some(14.1666)), "14.2%");
        assert_eq!(one_decimal(Some(10.0)), "10.0");
        assert_eq!(two_decimals(Some(2.0 / 3.0)), "0.67");
        assert_eq!(three_decimals(None), "N/D");
    }
}
