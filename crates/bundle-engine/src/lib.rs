//! Transfer engines for the sponsored bundle service.
//!
//! A transfer engine knows how to move one kind of asset from the executor
//! (the holder) to the recipient. It reads the holder's live on-chain
//! position and emits one unsigned transaction per asset, plus a
//! human-readable description of what will move. Engines never sign or
//! broadcast anything.
//!
//! Engines are selected by the `[engine] kind` configuration key and built by
//! the factory registered under that name.

use async_trait::async_trait;
use bundle_delivery::DeliveryService;
use bundle_types::{parse_address, Address, ConfigSchema, ImplementationRegistry, SponsoredTransaction};
use std::sync::Arc;
use thiserror::Error;

mod abi;

/// Re-export implementations
pub mod implementations {
	pub mod approval_erc721;
	pub mod multi_transfer_erc20;
	pub mod transfer_erc20;
	pub mod transfer_erc721;
}

/// Errors that can occur while building transfers.
#[derive(Debug, Error)]
pub enum EngineError {
	/// A holder, recipient or asset address is not well formed.
	#[error("Invalid address: {0}")]
	InvalidAddress(String),
	/// The holder has nothing to move for an asset.
	#[error("No balance: {0}")]
	NoBalance(String),
	/// An on-chain query failed.
	#[error("Query failed: {0}")]
	Query(String),
	/// The engine settings are unusable.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

/// Trait defining the interface for transfer engines.
#[async_trait]
pub trait TransferEngine: Send + Sync {
	/// Returns the configuration schema for this engine.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Describes every pending transfer, one asset per line.
	///
	/// Fails with [`EngineError::NoBalance`] if any asset has nothing to move.
	async fn description(&self) -> Result<String, EngineError>;

	/// Builds one unsigned transaction per asset, in configuration order.
	///
	/// Amounts come from a live query at call time. Fails with
	/// [`EngineError::NoBalance`] under the same condition as `description`.
	async fn sponsored_transactions(&self) -> Result<Vec<SponsoredTransaction>, EngineError>;
}

/// Everything an engine needs besides its own settings.
#[derive(Clone)]
pub struct EngineContext {
	/// Chain access for balance and ownership queries.
	pub delivery: Arc<DeliveryService>,
	/// Account holding the assets.
	pub holder: String,
	/// Account receiving the assets.
	pub recipient: String,
}

impl EngineContext {
	/// Parses holder and recipient, failing before any chain access.
	pub(crate) fn parties(&self) -> Result<(Address, Address), EngineError> {
		let holder = parse_address(&self.holder)
			.map_err(|e| EngineError::InvalidAddress(format!("holder: {}", e)))?;
		let recipient = parse_address(&self.recipient)
			.map_err(|e| EngineError::InvalidAddress(format!("recipient: {}", e)))?;
		Ok((holder, recipient))
	}
}

/// Type alias for engine factory functions.
pub type EngineFactory =
	fn(&toml::Value, EngineContext) -> Result<Box<dyn TransferEngine>, EngineError>;

/// Registry trait for engine implementations.
pub trait EngineRegistry: ImplementationRegistry<Factory = EngineFactory> {}

/// Get all registered engine implementations.
///
/// Returns a vector of (name, factory) tuples, one per `[engine] kind`.
pub fn get_all_implementations() -> Vec<(&'static str, EngineFactory)> {
	use implementations::{approval_erc721, multi_transfer_erc20, transfer_erc20, transfer_erc721};

	vec![
		(transfer_erc20::Registry::NAME, transfer_erc20::Registry::factory()),
		(
			multi_transfer_erc20::Registry::NAME,
			multi_transfer_erc20::Registry::factory(),
		),
		(approval_erc721::Registry::NAME, approval_erc721::Registry::factory()),
		(transfer_erc721::Registry::NAME, transfer_erc721::Registry::factory()),
	]
}

/// Parses an asset address from engine settings.
pub(crate) fn parse_asset(field: &str, value: &str) -> Result<Address, EngineError> {
	parse_address(value).map_err(|e| EngineError::InvalidAddress(format!("{}: {}", field, e)))
}

#[cfg(test)]
pub(crate) mod test_utils {
	//! In-memory chain serving ERC-20/721 view calls.

	use super::*;
	use alloy_primitives::{Bytes, B256, U256};
	use alloy_sol_types::SolCall;
	use bundle_delivery::{DeliveryError, DeliveryInterface};
	use bundle_types::ValidationError;
	use std::collections::HashMap;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	pub const HOLDER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
	pub const RECIPIENT: &str = "0x000000000000000000000000000000000000dead";

	struct NoSchema;

	impl ConfigSchema for NoSchema {
		fn validate(&self, _config: &toml::Value) -> Result<(), ValidationError> {
			Ok(())
		}
	}

	#[derive(Default)]
	pub struct MockChain {
		/// Balance of the holder per contract.
		pub balances: HashMap<Address, U256>,
		/// Owner per (contract, token id).
		pub owners: HashMap<(Address, U256), Address>,
		/// Artificial latency per contract, to shuffle completion order.
		pub delays: HashMap<Address, Duration>,
		pub calls: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl DeliveryInterface for MockChain {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(NoSchema)
		}

		async fn get_block_number(&self) -> Result<u64, DeliveryError> {
			Ok(1)
		}

		async fn get_base_fee(&self) -> Result<Option<u128>, DeliveryError> {
			Ok(None)
		}

		async fn estimate_gas(
			&self,
			_tx: &SponsoredTransaction,
			_from: Address,
		) -> Result<u64, DeliveryError> {
			Ok(21_000)
		}

		async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			if let Some(delay) = self.delays.get(&to) {
				tokio::time::sleep(*delay).await;
			}

			if data.starts_with(&crate::abi::IERC20::balanceOfCall::SELECTOR) {
				let balance = self.balances.get(&to).copied().unwrap_or_default();
				return Ok(Bytes::from(balance.to_be_bytes_vec()));
			}
			if data.starts_with(&crate::abi::IERC721::ownerOfCall::SELECTOR) {
				let call = crate::abi::IERC721::ownerOfCall::abi_decode(&data, true)
					.map_err(|e| DeliveryError::Network(e.to_string()))?;
				let owner = self
					.owners
					.get(&(to, call.tokenId))
					.copied()
					.ok_or_else(|| DeliveryError::Network("execution reverted".to_string()))?;
				return Ok(Bytes::from(owner.into_word().to_vec()));
			}
			Err(DeliveryError::Network("unexpected call".to_string()))
		}

		async fn get_nonce(&self, _address: Address) -> Result<u64, DeliveryError> {
			Ok(0)
		}

		async fn get_receipt_block(&self, _hash: B256) -> Result<Option<u64>, DeliveryError> {
			Ok(None)
		}

		async fn get_chain_id(&self) -> Result<u64, DeliveryError> {
			Ok(1)
		}
	}

	/// Wraps a mock chain into an engine context for the default parties.
	pub fn context(chain: MockChain) -> EngineContext {
		context_for(chain, HOLDER, RECIPIENT)
	}

	pub fn context_for(chain: MockChain, holder: &str, recipient: &str) -> EngineContext {
		EngineContext {
			delivery: Arc::new(DeliveryService::new(Box::new(chain), Duration::from_secs(1))),
			holder: holder.to_string(),
			recipient: recipient.to_string(),
		}
	}

	pub fn settings(text: &str) -> toml::Value {
		toml::from_str(text).unwrap()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_every_engine_kind_is_registered() {
		let names: Vec<&str> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(
			names,
			vec![
				"transfer_erc20",
				"multi_transfer_erc20",
				"approval_erc721",
				"transfer_erc721"
			]
		);
	}

	#[test]
	fn test_parties_are_validated() {
		let good = test_utils::context(test_utils::MockChain::default());
		assert!(good.parties().is_ok());

		let bad = test_utils::context_for(
			test_utils::MockChain::default(),
			test_utils::HOLDER,
			"0x000000000000000000000000000000000000dEad",
		);
		assert!(matches!(bad.parties(), Err(EngineError::InvalidAddress(_))));
	}
}
