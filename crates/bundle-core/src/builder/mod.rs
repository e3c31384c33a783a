//! Builder for wiring a sponsor engine from configuration.
//!
//! Each pluggable component (accounts, chain provider, relay, transfer
//! engine) is created through the factory registered under its name, so the
//! binary decides which implementations exist and configuration decides
//! which one runs.

use crate::engine::SponsorEngine;
use bundle_account::{AccountFactory, AccountService};
use bundle_config::Config;
use bundle_delivery::{DeliveryFactory, DeliveryService};
use bundle_engine::{EngineContext, EngineFactory};
use bundle_relay::{RelayFactory, RelayService};
use bundle_types::SecretString;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Account implementation used for every signer.
pub const ACCOUNT_IMPLEMENTATION: &str = "local";
/// Chain provider implementation.
pub const DELIVERY_IMPLEMENTATION: &str = "evm_alloy";

/// Errors that can occur while building a sponsor engine.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by name.
pub struct SponsorFactories {
	pub account_factories: HashMap<String, AccountFactory>,
	pub delivery_factories: HashMap<String, DeliveryFactory>,
	pub relay_factories: HashMap<String, RelayFactory>,
	pub engine_factories: HashMap<String, EngineFactory>,
}

/// Builder for constructing a SponsorEngine with pluggable implementations.
pub struct SponsorBuilder {
	config: Config,
}

impl SponsorBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the SponsorEngine, failing on the first component that cannot
	/// be created.
	pub async fn build(self, factories: SponsorFactories) -> Result<SponsorEngine, BuilderError> {
		self.config
			.validate()
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		let accounts = &self.config.accounts;
		let executor = self
			.account(&factories, "executor", &accounts.executor_private_key)
			.await?;
		let sponsor = self
			.account(&factories, "sponsor", &accounts.sponsor_private_key)
			.await?;
		let relay_signer = self
			.account(&factories, "relay_signer", &accounts.relay_signing_key)
			.await?;

		let factory = lookup(&factories.delivery_factories, "delivery", DELIVERY_IMPLEMENTATION)?;
		let delivery_config = table([(
			"rpc_url",
			toml::Value::String(self.config.network.rpc_url.clone()),
		)]);
		let delivery = match factory(&delivery_config) {
			Ok(implementation) => {
				tracing::info!(component = "delivery", implementation = DELIVERY_IMPLEMENTATION, "Loaded");
				Arc::new(DeliveryService::new(
					implementation,
					Duration::from_millis(self.config.network.head_poll_interval_ms),
				))
			},
			Err(e) => {
				tracing::error!(
					component = "delivery",
					implementation = DELIVERY_IMPLEMENTATION,
					error = %e,
					"Failed to create delivery implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create delivery implementation '{}': {}",
					DELIVERY_IMPLEMENTATION, e
				)));
			},
		};

		let relay_name = self.config.network.relay.as_str();
		let factory = lookup(&factories.relay_factories, "relay", relay_name)?;
		let relay_config = table([
			(
				"relay_url",
				toml::Value::String(self.config.network.relay_url.clone()),
			),
			(
				"resolution_poll_interval_ms",
				toml::Value::Integer(
					i64::try_from(self.config.submission.resolution_poll_interval_ms)
						.unwrap_or(i64::MAX),
				),
			),
		]);
		let relay = match factory(&relay_config, relay_signer.clone(), delivery.clone()) {
			Ok(implementation) => {
				tracing::info!(
					component = "relay",
					implementation = %relay_name,
					signer = %relay_signer.address(),
					"Loaded"
				);
				Arc::new(RelayService::new(implementation))
			},
			Err(e) => {
				tracing::error!(
					component = "relay",
					implementation = %relay_name,
					error = %e,
					"Failed to create relay implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create relay implementation '{}': {}",
					relay_name, e
				)));
			},
		};

		let engine_kind = self.config.engine.kind.as_str();
		let factory = lookup(&factories.engine_factories, "engine", engine_kind)?;
		let context = EngineContext {
			delivery: delivery.clone(),
			holder: executor.address().to_string(),
			recipient: self.config.recipient.clone(),
		};
		let transfer = match factory(&self.config.engine.settings_value(), context) {
			Ok(implementation) => {
				tracing::info!(component = "engine", implementation = %engine_kind, "Loaded");
				implementation
			},
			Err(e) => {
				tracing::error!(
					component = "engine",
					implementation = %engine_kind,
					error = %e,
					"Failed to create transfer engine"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create engine '{}': {}",
					engine_kind, e
				)));
			},
		};

		Ok(SponsorEngine::new(
			self.config,
			executor,
			sponsor,
			delivery,
			relay,
			transfer,
		))
	}

	/// Creates one account service from a private key.
	async fn account(
		&self,
		factories: &SponsorFactories,
		role: &str,
		key: &SecretString,
	) -> Result<Arc<AccountService>, BuilderError> {
		let factory = lookup(&factories.account_factories, "account", ACCOUNT_IMPLEMENTATION)?;
		let config = key.with_exposed(|secret| {
			table([("private_key", toml::Value::String(secret.to_string()))])
		});

		let service = match factory(&config) {
			Ok(implementation) => AccountService::new(implementation).await,
			Err(e) => Err(e),
		};

		match service {
			Ok(service) => {
				tracing::info!(component = "account", role, address = %service.address(), "Loaded");
				Ok(Arc::new(service))
			},
			Err(e) => {
				tracing::error!(component = "account", role, error = %e, "Failed to create account");
				Err(BuilderError::Config(format!(
					"Failed to create {} account: {}",
					role, e
				)))
			},
		}
	}
}

fn lookup<'a, F>(
	factories: &'a HashMap<String, F>,
	component: &str,
	name: &str,
) -> Result<&'a F, BuilderError> {
	factories.get(name).ok_or_else(|| {
		BuilderError::MissingComponent(format!("{} implementation '{}'", component, name))
	})
}

fn table<const N: usize>(entries: [(&str, toml::Value); N]) -> toml::Value {
	toml::Value::Table(
		entries
			.into_iter()
			.map(|(key, value)| (key.to_string(), value))
			.collect(),
	)
}
