//! Italian-locale number formatting for the stock table.

/// Format a quantity like `it-IT` with at most two fraction digits:
/// `.` groups thousands, `,` separates decimals, trailing zeros are dropped.
pub fn format_quantity(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    // Round half away from zero at the second decimal.
    let cents = (value.abs() * 100.0).round() as u128;
    let negative = value < 0.0 && cents != 0;
    let integer = cents / 100;
    let fraction = cents % 100;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(integer));

    if fraction != 0 {
        let digits = format!("{fraction:02}");
        out.push(',');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

fn group_thousands(n: u128) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands_with_dots() {
        assert_eq!(format_quantity(0.0), "0");
        assert_eq!(format_quantity(999.0), "999");
        assert_eq!(format_quantity(1000.0), "1.000");
        assert_eq!(format_quantity(1_234_567.0), "1.234.567");
    }

    #[test]
    fn keeps_at_most_two_decimals() {
        assert_eq!(format_quantity(2.5), "2,5");
        assert_eq!(format_quantity(0.333_333), "0,33");
        assert_eq!(format_quantity(1.005_1), "1,01");
        assert_eq!(format_quantity(12_000.10), "12.000,1");
    }

    #[test]
    fn negative_values_keep_sign() {
        assert_eq!(format_quantity(-15_000.0), "-15.000");
        assert_eq!(format_quantity(-0.001), "0");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Whole numbers render as their digits with dots every three places.
            #[test]
            fn integers_strip_to_plain_digits(n in 0i64..10_000_000_000) {
                let rendered = format_quantity(n as f64);
                prop_assert!(!rendered.contains(','));
                prop_assert_eq!(rendered.replace('.', ""), n.to_string());
            }
        }
    }
}
