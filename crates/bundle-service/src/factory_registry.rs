//! Registry of every implementation compiled into the binary.
//!
//! Collects the factories each component crate registers so the builder can
//! look up whatever configuration names, and reports the available names
//! when configuration asks for one that does not exist.

use bundle_account::AccountFactory;
use bundle_config::Config;
use bundle_core::{SponsorBuilder, SponsorEngine, SponsorFactories};
use bundle_delivery::DeliveryFactory;
use bundle_engine::EngineFactory;
use bundle_relay::RelayFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Factories for every component, keyed by implementation name.
#[derive(Default)]
pub struct FactoryRegistry {
	pub account: HashMap<String, AccountFactory>,
	pub delivery: HashMap<String, DeliveryFactory>,
	pub relay: HashMap<String, RelayFactory>,
	pub engine: HashMap<String, EngineFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register_account(&mut self, name: impl Into<String>, factory: AccountFactory) {
		self.account.insert(name.into(), factory);
	}

	pub fn register_delivery(&mut self, name: impl Into<String>, factory: DeliveryFactory) {
		self.delivery.insert(name.into(), factory);
	}

	pub fn register_relay(&mut self, name: impl Into<String>, factory: RelayFactory) {
		self.relay.insert(name.into(), factory);
	}

	pub fn register_engine(&mut self, name: impl Into<String>, factory: EngineFactory) {
		self.engine.insert(name.into(), factory);
	}

	/// Lists registered names of one component, sorted.
	fn available<F>(factories: &HashMap<String, F>) -> String {
		let mut names: Vec<_> = factories.keys().cloned().collect();
		names.sort();
		names.join(", ")
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available implementations
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in bundle_account::get_all_implementations() {
			tracing::debug!("Registering account implementation: {}", name);
			registry.register_account(name, factory);
		}

		for (name, factory) in bundle_delivery::get_all_implementations() {
			tracing::debug!("Registering delivery implementation: {}", name);
			registry.register_delivery(name, factory);
		}

		for (name, factory) in bundle_relay::get_all_implementations() {
			tracing::debug!("Registering relay implementation: {}", name);
			registry.register_relay(name, factory);
		}

		for (name, factory) in bundle_engine::get_all_implementations() {
			tracing::debug!("Registering engine implementation: {}", name);
			registry.register_engine(name, factory);
		}

		registry
	})
}

/// Get the global factory registry
pub fn get_registry() -> &'static FactoryRegistry {
	initialize_registry()
}

/// Builds the sponsor engine using the registry and configuration.
///
/// Unknown relay or engine names fail here with the list of names that do
/// exist.
pub async fn build_engine_from_config(
	config: Config,
) -> Result<SponsorEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	if !registry.relay.contains_key(&config.network.relay) {
		return Err(format!(
			"Unknown relay implementation '{}'. Available: [{}]",
			config.network.relay,
			FactoryRegistry::available(&registry.relay)
		)
		.into());
	}
	if !registry.engine.contains_key(&config.engine.kind) {
		return Err(format!(
			"Unknown engine implementation '{}'. Available: [{}]",
			config.engine.kind,
			FactoryRegistry::available(&registry.engine)
		)
		.into());
	}

	let factories = SponsorFactories {
		account_factories: registry.account.clone(),
		delivery_factories: registry.delivery.clone(),
		relay_factories: registry.relay.clone(),
		engine_factories: registry.engine.clone(),
	};

	Ok(SponsorBuilder::new(config).build(factories).await?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use bundle_config::builders::ConfigBuilder;

	#[test]
	fn test_registry_contains_all_implementations() {
		let registry = get_registry();

		assert!(registry.account.contains_key("local"));
		assert!(registry.delivery.contains_key("evm_alloy"));
		assert!(registry.relay.contains_key("flashbots"));
		assert_eq!(
			FactoryRegistry::available(&registry.engine),
			"approval_erc721, multi_transfer_erc20, transfer_erc20, transfer_erc721"
		);
	}

	#[tokio::test]
	async fn test_unknown_engine_lists_available() {
		let config = ConfigBuilder::new()
			.engine("cryptokitties", HashMap::new())
			.build();

		let err = build_engine_from_config(config).await.err().unwrap();
		let message = err.to_string();
		assert!(message.contains("Unknown engine implementation 'cryptokitties'"));
		assert!(message.contains("transfer_erc721"));
	}

	#[tokio::test]
	async fn test_builds_from_default_config() {
		let engine = build_engine_from_config(ConfigBuilder::new().build())
			.await
			.unwrap();
		assert_eq!(engine.config().engine.kind, "transfer_erc20");
	}
}
