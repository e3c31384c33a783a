//! Configuration module for the sponsored bundle service.
//!
//! Configuration is a single TOML file. Secrets and per-run addresses are not
//! written into the file directly but pulled from the environment through
//! `${VAR}` placeholders, so a typical file looks like:
//!
//! ```toml
//! recipient = "${RECIPIENT}"
//!
//! [network]
//! rpc_url = "${ETHEREUM_RPC_URL}"
//! relay_url = "${FLASHBOTS_RELAY_URL}"
//!
//! [accounts]
//! executor_private_key = "${PRIVATE_KEY_EXECUTOR}"
//! sponsor_private_key = "${PRIVATE_KEY_SPONSOR}"
//! relay_signing_key = "${FLASHBOTS_RELAY_SIGNING_KEY}"
//!
//! [engine]
//! kind = "multi_transfer_erc20"
//! tokens = ["0xb0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb"]
//! ```
//!
//! A missing variable aborts loading with a message that names it.

#[cfg(any(test, feature = "testing"))]
pub mod builders;

use bundle_types::{parse_address, SecretString};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Address that receives the executor's assets.
	pub recipient: String,
	/// Chain and relay endpoints.
	pub network: NetworkConfig,
	/// Signing keys for the three accounts involved.
	pub accounts: AccountsConfig,
	/// Which transfer engine to run, with its settings.
	pub engine: EngineConfig,
	/// Submission loop tuning.
	#[serde(default)]
	pub submission: SubmissionConfig,
}

/// Chain and relay endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// JSON-RPC endpoint of the chain.
	pub rpc_url: String,
	/// Base URL of the block-builder relay.
	pub relay_url: String,
	/// Relay client implementation.
	#[serde(default = "default_relay")]
	pub relay: String,
	/// Chain id; queried from the RPC endpoint when absent.
	pub chain_id: Option<u64>,
	/// How often to poll the chain for a new head.
	#[serde(default = "default_head_poll_interval_ms")]
	pub head_poll_interval_ms: u64,
}

fn default_relay() -> String {
	"flashbots".to_string()
}

fn default_head_poll_interval_ms() -> u64 {
	1_000
}

/// Private keys of the executor, the sponsor and the relay identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountsConfig {
	/// Key of the account holding the assets (and no ETH).
	pub executor_private_key: SecretString,
	/// Key of the account that pays for gas.
	pub sponsor_private_key: SecretString,
	/// Key that authenticates bundle submissions with the relay.
	pub relay_signing_key: SecretString,
}

/// Transfer engine selection.
///
/// `kind` names a registered engine; every other key is handed to that
/// engine's factory, which validates it against its own schema.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
	pub kind: String,
	#[serde(flatten)]
	pub settings: HashMap<String, toml::Value>,
}

impl EngineConfig {
	/// Returns the engine settings as a TOML table value.
	pub fn settings_value(&self) -> toml::Value {
		toml::Value::Table(
			self.settings
				.iter()
				.map(|(k, v)| (k.clone(), v.clone()))
				.collect(),
		)
	}
}

/// Submission loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmissionConfig {
	/// How many blocks ahead of the current head each submission targets.
	#[serde(default = "default_blocks_in_future")]
	pub blocks_in_future: u64,
	/// Priority premium added to the base fee, in gwei.
	#[serde(default = "default_priority_fee_gwei")]
	pub priority_fee_gwei: u64,
	/// Give up after this many attempts. Unlimited when absent.
	#[serde(default)]
	pub max_attempts: Option<u64>,
	/// How often the relay client polls while waiting for the target block.
	#[serde(default = "default_resolution_poll_interval_ms")]
	pub resolution_poll_interval_ms: u64,
}

impl Default for SubmissionConfig {
	fn default() -> Self {
		Self {
			blocks_in_future: default_blocks_in_future(),
			priority_fee_gwei: default_priority_fee_gwei(),
			max_attempts: None,
			resolution_poll_interval_ms: default_resolution_poll_interval_ms(),
		}
	}
}

fn default_blocks_in_future() -> u64 {
	2
}

fn default_priority_fee_gwei() -> u64 {
	25
}

fn default_resolution_poll_interval_ms() -> u64 {
	1_000
}

/// Explains what a known environment variable must contain.
fn env_var_hint(var_name: &str) -> Option<&'static str> {
	match var_name {
		"PRIVATE_KEY_EXECUTOR" => Some(
			"the private key of the Ethereum EOA holding the assets to be transferred",
		),
		"PRIVATE_KEY_SPONSOR" => {
			Some("the private key of an Ethereum EOA with ETH to pay for the bundle's gas")
		},
		"FLASHBOTS_RELAY_SIGNING_KEY" => {
			Some("a private key used only to identify this sender to the relay")
		},
		"RECIPIENT" => Some("the address which will receive the assets"),
		"ETHEREUM_RPC_URL" => Some("the JSON-RPC endpoint of the chain"),
		"FLASHBOTS_RELAY_URL" => Some("the relay base URL for the chosen network"),
		_ => None,
	}
}

/// Resolves environment variables in a string.
///
/// Replaces `${VAR_NAME}` with the value of `VAR_NAME` and supports defaults
/// with `${VAR_NAME:-default_value}`. Input is capped at 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let var_name = var_name.as_str();
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) if !v.is_empty() => v,
			_ => match default_value {
				Some(default) => default.to_string(),
				None => {
					let message = match env_var_hint(var_name) {
						Some(hint) => format!(
							"Must provide {} environment variable, {}",
							var_name, hint
						),
						None => format!("Environment variable '{}' not found", var_name),
					};
					return Err(ConfigError::Validation(message));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Reverse order keeps earlier offsets valid
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	/// Validates the configuration.
	///
	/// Secrets must be non-blank, the recipient must be a well-formed address,
	/// and the submission parameters must describe a usable loop.
	pub fn validate(&self) -> Result<(), ConfigError> {
		parse_address(&self.recipient)
			.map_err(|e| ConfigError::Validation(format!("Invalid recipient: {}", e)))?;

		let keys = [
			("executor_private_key", &self.accounts.executor_private_key),
			("sponsor_private_key", &self.accounts.sponsor_private_key),
			("relay_signing_key", &self.accounts.relay_signing_key),
		];
		for (name, key) in keys {
			if key.is_blank() {
				return Err(ConfigError::Validation(format!(
					"accounts.{} cannot be empty",
					name
				)));
			}
		}

		if self.network.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation(
				"network.rpc_url cannot be empty".into(),
			));
		}
		if self.network.relay_url.trim().is_empty() {
			return Err(ConfigError::Validation(
				"network.relay_url cannot be empty".into(),
			));
		}
		if self.network.head_poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"network.head_poll_interval_ms must be at least 1".into(),
			));
		}

		if self.engine.kind.trim().is_empty() {
			return Err(ConfigError::Validation("engine.kind cannot be empty".into()));
		}

		if self.submission.blocks_in_future == 0 {
			return Err(ConfigError::Validation(
				"submission.blocks_in_future must be at least 1".into(),
			));
		}
		if self.submission.max_attempts == Some(0) {
			return Err(ConfigError::Validation(
				"submission.max_attempts must be at least 1 when set".into(),
			));
		}
		if self.submission.resolution_poll_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"submission.resolution_poll_interval_ms must be at least 1".into(),
			));
		}

		Ok(())
	}
}

/// Parses configuration from TOML text.
///
/// Environment variables are resolved first and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
