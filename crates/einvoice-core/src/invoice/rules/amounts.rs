//! Amount display helpers.

/// Currency glyph printed in front of amounts.
pub const CURRENCY_SIGN: char = '¥';

/// Prefix an amount with the currency glyph, verbatim otherwise.
pub fn with_currency(amount: &str) -> String {
    let mut out = String::with_capacity(amount.len() + CURRENCY_SIGN.len_utf8());
    out.push(CURRENCY_SIGN);
    out.push_str(amount);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_currency() {
        assert_eq!(with_currency("1234.56"), "¥1234.56");
        assert_eq!(with_currency("-10.00"), "¥-10.00");
    }

    #[test]
    fn test_with_currency_empty() {
        assert_eq!(with_currency(""), "¥");
    }
}
