//! Zeroising wrapper for private keys and other secrets.
//!
//! Executor, sponsor and relay signing keys all travel through configuration
//! as `SecretString`. The value is wiped on drop and never printed by `Debug`,
//! `Display` or `Serialize`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// A string that zeroes its memory on drop and redacts itself in output.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Exposes the secret to a closure, keeping the exposure scoped.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}

	/// Exposes the secret as a string slice.
	///
	/// Prefer [`SecretString::with_exposed`]; never log the returned value.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	/// Returns true if the secret is empty or only whitespace.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

	#[test]
	fn test_private_key_never_printed() {
		let secret = SecretString::from(KEY);
		assert_eq!(format!("{:?}", secret), "SecretString(***REDACTED***)");
		assert_eq!(format!("{}", secret), "***REDACTED***");
		assert_eq!(
			serde_json::to_string(&secret).unwrap(),
			"\"***REDACTED***\""
		);
	}

	#[test]
	fn test_with_exposed_sees_value() {
		let secret = SecretString::from(KEY);
		let len = secret.with_exposed(|key| {
			assert!(key.starts_with("0x"));
			key.len()
		});
		assert_eq!(len, 66);
		assert_eq!(secret.expose_secret(), KEY);
	}

	#[test]
	fn test_blank_detection() {
		assert!(SecretString::from("").is_blank());
		assert!(SecretString::from("   ").is_blank());
		assert!(!SecretString::from(KEY).is_blank());
	}

	#[test]
	fn test_deserialize_from_toml() {
		#[derive(Deserialize)]
		struct Keys {
			executor: SecretString,
		}
		let keys: Keys = toml::from_str(&format!("executor = \"{}\"", KEY)).unwrap();
		assert_eq!(keys.executor, SecretString::from(KEY));
	}
}
