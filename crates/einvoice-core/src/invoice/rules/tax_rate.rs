//! Tax rate display formatting.
//!
//! Source documents carry the rate as a decimal fraction (`0.06`) or, for items
//! where no rate applies, a placeholder token such as `免税` or `***`.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Tax rate of a line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxRate {
    /// Numeric rate as a fraction of one.
    Rate(Decimal),
    /// Non-numeric placeholder, displayed as-is.
    Marker(String),
}

impl TaxRate {
    /// Interpret a raw tax rate field.
    ///
    /// Numbers whose percentage does not fit a `Decimal` are kept as markers.
    pub fn parse(raw: &str) -> Self {
        match Decimal::from_str(raw.trim()) {
            Ok(rate) if rate.checked_mul(Decimal::ONE_HUNDRED).is_some() => TaxRate::Rate(rate),
            _ => TaxRate::Marker(raw.to_string()),
        }
    }

    /// Format for display: `0.06` becomes `6%`, markers pass through.
    pub fn display(&self) -> String {
        match self {
            TaxRate::Rate(rate) => {
                let Some(percent) = rate.checked_mul(Decimal::ONE_HUNDRED) else {
                    return rate.to_string();
                };
                let mut percent = percent.to_string();
                if percent.contains('.') {
                    let trimmed = percent.trim_end_matches('0').trim_end_matches('.').len();
                    percent.truncate(trimmed);
                }
                percent.push('%');
                percent
            }
            TaxRate::Marker(marker) => marker.clone(),
        }
    }
}

/// Format a raw tax rate field for display.
pub fn format_tax_rate(raw: &str) -> String {
    TaxRate::parse(raw).display()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_common_rates() {
        assert_eq!(format_tax_rate("0.06"), "6%");
        assert_eq!(format_tax_rate("0.13"), "13%");
        assert_eq!(format_tax_rate("0.09"), "9%");
        assert_eq!(format_tax_rate("0.1"), "10%");
        assert_eq!(format_tax_rate("0.03"), "3%");
    }

    #[test]
    fn test_format_boundaries() {
        assert_eq!(format_tax_rate("0"), "0%");
        assert_eq!(format_tax_rate("1"), "100%");
        assert_eq!(format_tax_rate("0.00"), "0%");
    }

    #[test]
    fn test_integer_percentages_keep_zeros() {
        // 100 has no decimal point, so its zeros are significant
        assert_eq!(format_tax_rate("1"), "100%");
        assert_eq!(format_tax_rate("10"), "1000%");
    }

    #[test]
    fn test_fractional_percentages() {
        assert_eq!(format_tax_rate("0.015"), "1.5%");
        assert_eq!(format_tax_rate("0.0050"), "0.5%");
    }

    #[test]
    fn test_markers_pass_through() {
        assert_eq!(format_tax_rate("免税"), "免税");
        assert_eq!(format_tax_rate("***"), "***");
        assert_eq!(format_tax_rate("不征税"), "不征税");
        assert_eq!(format_tax_rate(""), "");
        assert_eq!(format_tax_rate("6%"), "6%");
    }

    #[test]
    fn test_whitespace_around_number() {
        assert_eq!(format_tax_rate(" 0.06 "), "6%");
    }

    #[test]
    fn test_out_of_range_rate_passes_through() {
        let raw = "79228162514264337593543950335";
        assert_eq!(TaxRate::parse(raw), TaxRate::Marker(raw.to_string()));
        assert_eq!(format_tax_rate(raw), raw);
        assert_eq!(TaxRate::Rate(Decimal::MAX).display(), Decimal::MAX.to_string());
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!(TaxRate::parse("0.13"), TaxRate::Rate(Decimal::new(13, 2)));
        assert_eq!(
            TaxRate::parse("免税"),
            TaxRate::Marker("免税".to_string())
        );
    }
}
