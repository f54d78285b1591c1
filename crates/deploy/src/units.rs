//! Native unit (HBAR as exposed by the JSON-RPC relay, 18 decimals) formatting and parsing.

use alloy_core::primitives::{
    U256,
    utils::{format_ether, parse_ether},
};

/// Ticker appended to rendered amounts.
pub const NATIVE_SYMBOL: &str = "HBAR";

/// Render a wei amount with full precision, trailing zeros trimmed, e.g. `12.5 HBAR`.
pub fn format_native(amount: U256) -> String {
    let rendered = format_ether(amount);
    let trimmed = if rendered.contains('.') {
        rendered.trim_end_matches('0').trim_end_matches('.')
    } else {
        rendered.as_str()
    };
    format!("{trimmed} {NATIVE_SYMBOL}")
}

/// Parse a decimal native amount (at most 18 decimals) into wei.
pub fn parse_native(amount: &str) -> Result<U256, String> {
    parse_ether(amount.trim()).map_err(|e| format!("'{amount}' is not a native amount: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_trims_trailing_zeros() {
        assert_eq!(format_native(parse_native("12.5").unwrap()), "12.5 HBAR");
        assert_eq!(format_native(parse_native("10").unwrap()), "10 HBAR");
        assert_eq!(format_native(U256::ZERO), "0 HBAR");
    }

    #[test]
    fn test_format_keeps_full_precision() {
        assert_eq!(format_native(U256::from(1u64)), "0.000000000000000001 HBAR");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_native("abc").is_err());
    }
}
