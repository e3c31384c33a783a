//! Configuration builder for creating test configurations.
//!
//! Produces a valid [`Config`] pointing at local endpoints with well-known
//! development keys, so tests only override what they exercise.

use crate::{AccountsConfig, Config, EngineConfig, NetworkConfig, SubmissionConfig};
use bundle_types::SecretString;
use std::collections::HashMap;

/// Builder for creating `Config` instances with a fluent API.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	recipient: String,
	rpc_url: String,
	relay_url: String,
	chain_id: Option<u64>,
	executor_private_key: String,
	sponsor_private_key: String,
	relay_signing_key: String,
	engine_kind: String,
	engine_settings: HashMap<String, toml::Value>,
	submission: SubmissionConfig,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	/// Creates a new `ConfigBuilder` with default values suitable for testing.
	pub fn new() -> Self {
		let mut engine_settings = HashMap::new();
		engine_settings.insert(
			"token".to_string(),
			toml::Value::String("0xb0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb".to_string()),
		);

		Self {
			recipient: "0x000000000000000000000000000000000000dead".to_string(),
			rpc_url: "http://127.0.0.1:8545".to_string(),
			relay_url: "http://127.0.0.1:18545".to_string(),
			chain_id: Some(1),
			executor_private_key:
				"0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d".to_string(),
			sponsor_private_key:
				"0x5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a".to_string(),
			relay_signing_key:
				"0x7c852118294e51e653712a81e05800f419141751be58f605c371e15141b007a6".to_string(),
			engine_kind: "transfer_erc20".to_string(),
			engine_settings,
			submission: SubmissionConfig::default(),
		}
	}

	/// Sets the recipient address.
	pub fn recipient(mut self, recipient: impl Into<String>) -> Self {
		self.recipient = recipient.into();
		self
	}

	/// Sets the chain id; `None` means it is queried at startup.
	pub fn chain_id(mut self, chain_id: Option<u64>) -> Self {
		self.chain_id = chain_id;
		self
	}

	/// Sets the relay URL.
	pub fn relay_url(mut self, url: impl Into<String>) -> Self {
		self.relay_url = url.into();
		self
	}

	/// Replaces the engine selection and its settings.
	pub fn engine(mut self, kind: impl Into<String>, settings: HashMap<String, toml::Value>) -> Self {
		self.engine_kind = kind.into();
		self.engine_settings = settings;
		self
	}

	/// Sets how many blocks ahead submissions target.
	pub fn blocks_in_future(mut self, blocks: u64) -> Self {
		self.submission.blocks_in_future = blocks;
		self
	}

	/// Sets the priority premium in gwei.
	pub fn priority_fee_gwei(mut self, gwei: u64) -> Self {
		self.submission.priority_fee_gwei = gwei;
		self
	}

	/// Caps the number of submission attempts.
	pub fn max_attempts(mut self, attempts: Option<u64>) -> Self {
		self.submission.max_attempts = attempts;
		self
	}

	/// Builds the `Config` with the configured values.
	pub fn build(self) -> Config {
		Config {
			recipient: self.recipient,
			network: NetworkConfig {
				rpc_url: self.rpc_url,
				relay_url: self.relay_url,
				relay: "flashbots".to_string(),
				chain_id: self.chain_id,
				head_poll_interval_ms: 1_000,
			},
			accounts: AccountsConfig {
				executor_private_key: SecretString::from(self.executor_private_key),
				sponsor_private_key: SecretString::from(self.sponsor_private_key),
				relay_signing_key: SecretString::from(self.relay_signing_key),
			},
			engine: EngineConfig {
				kind: self.engine_kind,
				settings: self.engine_settings,
			},
			submission: self.submission,
		}
	}
}
