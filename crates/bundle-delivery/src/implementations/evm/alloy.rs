//! Alloy-based chain provider.
//!
//! Talks JSON-RPC over HTTP to a single EVM node using the Alloy library.

use crate::{DeliveryError, DeliveryInterface};
use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{BlockNumberOrTag, BlockTransactionsKind, TransactionRequest};
use alloy_transport_http::Http;
use async_trait::async_trait;
use bundle_types::{ConfigSchema, Field, FieldType, Schema, SponsoredTransaction, ValidationError};

/// Alloy-based EVM chain provider.
pub struct AlloyDelivery {
	provider: RootProvider<Http<reqwest::Client>>,
}

impl AlloyDelivery {
	/// Creates a new AlloyDelivery for the given RPC URL.
	///
	/// No request is made until the first call.
	pub fn new(rpc_url: &str) -> Result<Self, DeliveryError> {
		let url = rpc_url
			.parse()
			.map_err(|e| DeliveryError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?;

		Ok(Self {
			provider: RootProvider::new_http(url),
		})
	}
}

/// Configuration schema for the Alloy chain provider.
pub struct AlloyDeliverySchema;

impl AlloyDeliverySchema {
	/// Static validation method for use before instance creation
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		let instance = Self;
		instance.validate(config)
	}
}

impl ConfigSchema for AlloyDeliverySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("rpc_url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
						Ok(())
					},
					_ => Err("rpc_url must be an http(s) URL".to_string()),
				}
			})],
			vec![],
		);

		schema.validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyDeliverySchema)
	}

	async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get block number: {}", e)))
	}

	async fn get_base_fee(&self) -> Result<Option<u128>, DeliveryError> {
		let block = self
			.provider
			.get_block_by_number(BlockNumberOrTag::Latest, BlockTransactionsKind::Hashes)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get latest block: {}", e)))?
			.ok_or_else(|| DeliveryError::Network("Latest block not found".to_string()))?;

		Ok(block.header.base_fee_per_gas.map(u128::from))
	}

	async fn estimate_gas(
		&self,
		tx: &SponsoredTransaction,
		from: Address,
	) -> Result<u64, DeliveryError> {
		let mut request = TransactionRequest::default()
			.from(from)
			.to(tx.to)
			.input(tx.data.clone().into());
		if let Some(value) = tx.value {
			request = request.value(value);
		}

		self.provider
			.estimate_gas(&request)
			.await
			.map_err(|e| DeliveryError::Estimation(e.to_string()))
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		let request = TransactionRequest::default().to(to).input(data.into());

		self.provider
			.call(&request)
			.await
			.map_err(|e| DeliveryError::Network(format!("Call to {} failed: {}", to, e)))
	}

	async fn get_nonce(&self, address: Address) -> Result<u64, DeliveryError> {
		self.provider
			.get_transaction_count(address)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get nonce: {}", e)))
	}

	async fn get_receipt_block(&self, hash: B256) -> Result<Option<u64>, DeliveryError> {
		let receipt = self
			.provider
			.get_transaction_receipt(hash)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {}", e)))?;

		Ok(receipt.and_then(|r| r.block_number))
	}

	async fn get_chain_id(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_chain_id()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get chain id: {}", e)))
	}
}

/// Factory function to create an HTTP chain provider from configuration.
///
/// # Parameters
/// - `config`: TOML table containing `rpc_url` (required)
pub fn create_http_delivery(
	config: &toml::Value,
) -> Result<Box<dyn DeliveryInterface>, DeliveryError> {
	AlloyDeliverySchema::validate_config(config)
		.map_err(|e| DeliveryError::InvalidConfig(e.to_string()))?;

	let rpc_url = config
		.get("rpc_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| DeliveryError::InvalidConfig("rpc_url is required".to_string()))?;

	Ok(Box::new(AlloyDelivery::new(rpc_url)?))
}

/// Registry for the HTTP/Alloy delivery implementation.
pub struct Registry;

impl bundle_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = crate::DeliveryFactory;

	fn factory() -> Self::Factory {
		create_http_delivery
	}
}

impl crate::DeliveryRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	fn rpc_config(url: &str) -> toml::Value {
		toml::from_str(&format!("rpc_url = \"{}\"", url)).unwrap()
	}

	#[test]
	fn test_factory_accepts_http_url() {
		assert!(create_http_delivery(&rpc_config("http://127.0.0.1:8545")).is_ok());
		assert!(create_http_delivery(&rpc_config("https://eth.example.org/v1/key")).is_ok());
	}

	#[test]
	fn test_factory_rejects_bad_config() {
		assert!(matches!(
			create_http_delivery(&rpc_config("ws://127.0.0.1:8546")),
			Err(DeliveryError::InvalidConfig(_))
		));

		let empty = toml::Value::Table(toml::map::Map::new());
		let err = create_http_delivery(&empty).err().unwrap();
		assert!(err.to_string().contains("rpc_url"));
	}
}
