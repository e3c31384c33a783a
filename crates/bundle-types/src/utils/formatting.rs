//! String formatting utilities.
//!
//! Provides id truncation for log lines and gwei rendering of gas prices.

use super::constants::GWEI;
use alloy_primitives::U256;

/// Truncates a hex string for display, keeping the first 10 characters.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Renders a wei amount in gwei, truncated to two decimal places.
///
/// Trailing zeros of the fractional part are dropped, so 30 gwei renders as
/// `"30"` and 30.5 gwei as `"30.5"`.
pub fn format_gwei(wei: U256) -> String {
	let hundredths = wei * U256::from(100u64) / U256::from(GWEI);
	let whole = hundredths / U256::from(100u64);
	let fraction = (hundredths % U256::from(100u64)).to::<u64>();

	match fraction {
		0 => whole.to_string(),
		f if f % 10 == 0 => format!("{}.{}", whole, f / 10),
		f => format!("{}.{:02}", whole, f),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("0x12345678"), "0x12345678");
		assert_eq!(truncate_id("0x1234567890abcdef"), "0x12345678..");
	}

	#[test]
	fn test_format_gwei() {
		assert_eq!(format_gwei(U256::from(30 * GWEI)), "30");
		assert_eq!(format_gwei(U256::from(30 * GWEI + GWEI / 2)), "30.5");
		assert_eq!(format_gwei(U256::from(25 * GWEI + 123_456_789)), "25.12");
		assert_eq!(format_gwei(U256::from(1_000_000u64)), "0");
		assert_eq!(format_gwei(U256::ZERO), "0");
	}
}
