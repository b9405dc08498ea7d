// =============================================================================
// Display formatting for prices and volumes
// =============================================================================
//
// Precision steps with magnitude so that both BTC (five digits) and sub-cent
// pairs stay readable:
//   |price| >= 1000  -> 2 decimals
//   |price| >= 1     -> 4 decimals
//   otherwise        -> 6 decimals
// =============================================================================

/// Format a price with magnitude-dependent precision.
pub fn format_price(price: f64) -> String {
    let magnitude = price.abs();
    if magnitude >= 1_000.0 {
        format!("{price:.2}")
    } else if magnitude >= 1.0 {
        format!("{price:.4}")
    } else {
        format!("{price:.6}")
    }
}

/// Format a quantity or notional with a B / M / K suffix.
pub fn format_number(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if magnitude >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else if magnitude >= 1e3 {
        format!("{:.2}K", value / 1e3)
    } else {
        format!("{value:.2}")
    }
}

/// Signed percentage, e.g. `+1.25%` / `-0.40%`.
pub fn format_percent(pct: f64) -> String {
    if pct >= 0.0 {
        format!("+{pct:.2}%")
    } else {
        format!("{pct:.2}%")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_precision_boundaries() {
        assert_eq!(format_price(0.0000012), "0.000001");
        assert_eq!(format_price(1234.5), "1234.50");
        assert_eq!(format_price(0.5), "0.500000");
        assert_eq!(format_price(1.0), "1.0000");
        assert_eq!(format_price(999.99999), "1000.0000");
        assert_eq!(format_price(1000.0), "1000.00");
    }

    #[test]
    fn negative_prices_use_magnitude() {
        assert_eq!(format_price(-12.5), "-12.5000");
        assert_eq!(format_price(-1500.0), "-1500.00");
    }

    #[test]
    fn number_suffixes() {
        assert_eq!(format_number(1_500_000_000.0), "1.50B");
        assert_eq!(format_number(2_500.0), "2.50K");
        assert_eq!(format_number(42.0), "42.00");
        assert_eq!(format_number(3_250_000.0), "3.25M");
        assert_eq!(format_number(999.0), "999.00");
    }

    #[test]
    fn percent_has_sign() {
        assert_eq!(format_percent(1.234), "+1.23%");
        assert_eq!(format_percent(-0.4), "-0.40%");
        assert_eq!(format_percent(0.0), "+0.00%");
    }
}
