//! ERC-721 token transfer.
//!
//! Moves specific token ids of one collection from the holder to the
//! recipient with `transferFrom`. Ownership of every id is checked first.

use crate::abi::{self, IERC721};
use crate::{EngineContext, EngineError, TransferEngine};
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use bundle_delivery::DeliveryService;
use bundle_types::{
	non_empty_array, ConfigSchema, Field, FieldType, Schema, SponsoredTransaction, ValidationError,
};
use futures::future::try_join_all;
use std::str::FromStr;
use std::sync::Arc;

pub struct TransferErc721 {
	delivery: Arc<DeliveryService>,
	holder: Address,
	recipient: Address,
	contract: Address,
	token_ids: Vec<U256>,
}

impl TransferErc721 {
	pub fn new(
		context: EngineContext,
		contract: &str,
		token_ids: Vec<U256>,
	) -> Result<Self, EngineError> {
		let (holder, recipient) = context.parties()?;
		let contract = crate::parse_asset("contract", contract)?;
		if token_ids.is_empty() {
			return Err(EngineError::InvalidConfig(
				"at least one token id is required".to_string(),
			));
		}

		Ok(Self {
			delivery: context.delivery,
			holder,
			recipient,
			contract,
			token_ids,
		})
	}

	/// Fails with `NoBalance` for the first id the holder does not own.
	async fn check_ownership(&self) -> Result<(), EngineError> {
		try_join_all(self.token_ids.iter().map(|&token_id| async move {
			let owner = abi::owner_of(&self.delivery, self.contract, token_id).await?;
			if owner != self.holder {
				return Err(EngineError::NoBalance(format!(
					"{} does not own token {} of {} (owner {})",
					self.holder, token_id, self.contract, owner
				)));
			}
			Ok::<(), EngineError>(())
		}))
		.await?;
		Ok(())
	}
}

/// Configuration schema for the ERC-721 transfer engine.
pub struct TransferErc721Schema;

impl ConfigSchema for TransferErc721Schema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![
				Field::new("contract", FieldType::Address),
				Field::new("token_ids", FieldType::Array(Box::new(FieldType::String)))
					.with_validator(|value| {
						non_empty_array(value)?;
						for id in value.as_array().into_iter().flatten() {
							let id = id.as_str().unwrap_or_default();
							U256::from_str(id)
								.map_err(|_| format!("'{}' is not a token id", id))?;
						}
						Ok(())
					}),
			],
			vec![],
		)
		.validate(config)
	}
}

#[async_trait]
impl TransferEngine for TransferErc721 {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(TransferErc721Schema)
	}

	async fn description(&self) -> Result<String, EngineError> {
		self.check_ownership().await?;
		let lines: Vec<String> = self
			.token_ids
			.iter()
			.map(|id| {
				format!(
					"Transfer ERC721 token {} @ {} from {} to {}",
					id, self.contract, self.holder, self.recipient
				)
			})
			.collect();
		Ok(lines.join("\n"))
	}

	async fn sponsored_transactions(&self) -> Result<Vec<SponsoredTransaction>, EngineError> {
		self.check_ownership().await?;
		Ok(self
			.token_ids
			.iter()
			.map(|&token_id| {
				let data = IERC721::transferFromCall {
					from: self.holder,
					to: self.recipient,
					tokenId: token_id,
				}
				.abi_encode();
				SponsoredTransaction::call(self.contract, data)
			})
			.collect())
	}
}

/// Factory function to create the engine from `[engine]` settings.
///
/// Expects a `contract` address and a non-empty `token_ids` array of decimal
/// or 0x-prefixed hex strings.
pub fn create_engine(
	config: &toml::Value,
	context: EngineContext,
) -> Result<Box<dyn TransferEngine>, EngineError> {
	context.parties()?;
	TransferErc721Schema
		.validate(config)
		.map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

	let contract = config
		.get("contract")
		.and_then(|v| v.as_str())
		.ok_or_else(|| EngineError::InvalidConfig("contract is required".to_string()))?;

	let token_ids = config
		.get("token_ids")
		.and_then(|v| v.as_array())
		.map(|arr| arr.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>())
		.unwrap_or_default()
		.into_iter()
		.map(|id| {
			U256::from_str(id)
				.map_err(|e| EngineError::InvalidConfig(format!("token id '{}': {}", id, e)))
		})
		.collect::<Result<Vec<_>, _>>()?;

	Ok(Box::new(TransferErc721::new(context, contract, token_ids)?))
}

/// Registry for the ERC-721 transfer engine.
pub struct Registry;

impl bundle_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "transfer_erc721";
	type Factory = crate::EngineFactory;

	fn factory() -> Self::Factory {
		create_engine
	}
}

impl crate::EngineRegistry for Registry {}
