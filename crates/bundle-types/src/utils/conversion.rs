//! Address parsing with well-formedness checks.

use alloy_primitives::Address;

/// Parses a hex account address, rejecting anything that is not well formed.
///
/// Accepts 40 hex characters with or without a `0x` prefix. All-lowercase and
/// all-uppercase forms are accepted as-is; mixed case must be a valid EIP-55
/// checksum.
pub fn parse_address(input: &str) -> Result<Address, String> {
	let trimmed = input.trim();
	let hex_part = trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
		.unwrap_or(trimmed);

	if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
		return Err(format!("'{}' is not a 20-byte hex address", trimmed));
	}

	let has_lower = hex_part.chars().any(|c| c.is_ascii_lowercase());
	let has_upper = hex_part.chars().any(|c| c.is_ascii_uppercase());

	if has_lower && has_upper {
		Address::parse_checksummed(format!("0x{}", hex_part), None)
			.map_err(|_| format!("address '{}' has an invalid checksum", trimmed))
	} else {
		hex_part
			.parse::<Address>()
			.map_err(|e| format!("invalid address '{}': {}", trimmed, e))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_accepts_lowercase_and_checksummed() {
		let lower = parse_address("0xb0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb").unwrap();
		let upper = parse_address("0xB0C0F148FB8D943EA8E2C5BD87034DD5F39E16EB").unwrap();
		assert_eq!(lower, upper);

		let checksummed = lower.to_checksum(None);
		assert_eq!(parse_address(&checksummed).unwrap(), lower);
	}

	#[test]
	fn test_accepts_unprefixed() {
		let prefixed = parse_address("0xb0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb").unwrap();
		let bare = parse_address("b0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb").unwrap();
		assert_eq!(bare, prefixed);

		let checksummed = prefixed.to_checksum(None);
		assert_eq!(parse_address(&checksummed[2..]).unwrap(), prefixed);
		assert!(parse_address("B0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb").is_err());
	}

	#[test]
	fn test_rejects_malformed() {
		assert!(parse_address("").is_err());
		assert!(parse_address("0x").is_err());
		assert!(parse_address("xb0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb").is_err());
		assert!(parse_address("0xb0c0f148fb8d943ea8e2c5bd87034dd5f39e16").is_err());
		assert!(parse_address("0xz0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb").is_err());
	}

	#[test]
	fn test_rejects_bad_checksum() {
		// Valid hex, mixed case, wrong checksum.
		assert!(parse_address("0xB0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb").is_err());
	}
}
