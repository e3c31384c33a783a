//! ERC-721 operator approval.
//!
//! Grants the recipient operator rights over every NFT the holder owns in
//! each configured collection, so the recipient can withdraw them later
//! without the holder spending gas.

use crate::abi::{self, IERC721};
use crate::{EngineContext, EngineError, TransferEngine};
use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use bundle_delivery::DeliveryService;
use bundle_types::{
	non_empty_array, ConfigSchema, Field, FieldType, Schema, SponsoredTransaction, ValidationError,
};
use futures::future::try_join_all;
use std::sync::Arc;

pub struct ApprovalErc721 {
	delivery: Arc<DeliveryService>,
	holder: Address,
	recipient: Address,
	contracts: Vec<Address>,
}

impl ApprovalErc721 {
	pub fn new(context: EngineContext, contracts: &[&str]) -> Result<Self, EngineError> {
		let (holder, recipient) = context.parties()?;
		if contracts.is_empty() {
			return Err(EngineError::InvalidConfig(
				"at least one contract is required".to_string(),
			));
		}
		let contracts = contracts
			.iter()
			.enumerate()
			.map(|(i, contract)| crate::parse_asset(&format!("contracts[{}]", i), contract))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			delivery: context.delivery,
			holder,
			recipient,
			contracts,
		})
	}

	/// Fails unless the holder owns at least one token in every collection.
	async fn check_holdings(&self) -> Result<(), EngineError> {
		try_join_all(self.contracts.iter().map(|&contract| async move {
			let balance = abi::balance_of(&self.delivery, contract, self.holder).await?;
			abi::require_balance(balance, contract, self.holder)
		}))
		.await?;
		Ok(())
	}
}

/// Configuration schema for the ERC-721 approval engine.
pub struct ApprovalErc721Schema;

impl ConfigSchema for ApprovalErc721Schema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![
				Field::new("contracts", FieldType::Array(Box::new(FieldType::Address)))
					.with_validator(non_empty_array),
			],
			vec![],
		)
		.validate(config)
	}
}

#[async_trait]
impl TransferEngine for ApprovalErc721 {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(ApprovalErc721Schema)
	}

	async fn description(&self) -> Result<String, EngineError> {
		self.check_holdings().await?;
		let contracts: Vec<String> = self.contracts.iter().map(|c| c.to_string()).collect();
		Ok(format!(
			"Giving {} approval for: {}",
			self.recipient,
			contracts.join(", ")
		))
	}

	async fn sponsored_transactions(&self) -> Result<Vec<SponsoredTransaction>, EngineError> {
		self.check_holdings().await?;
		Ok(self
			.contracts
			.iter()
			.map(|&contract| {
				let data = IERC721::setApprovalForAllCall {
					operator: self.recipient,
					approved: true,
				}
				.abi_encode();
				SponsoredTransaction::call(contract, data)
			})
			.collect())
	}
}

/// Factory function to create the engine from `[engine]` settings.
///
/// Expects a non-empty `contracts` array of ERC-721 addresses.
pub fn create_engine(
	config: &toml::Value,
	context: EngineContext,
) -> Result<Box<dyn TransferEngine>, EngineError> {
	context.parties()?;
	ApprovalErc721Schema
		.validate(config)
		.map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

	let contracts: Vec<&str> = config
		.get("contracts")
		.and_then(|v| v.as_array())
		.map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
		.unwrap_or_default();

	Ok(Box::new(ApprovalErc721::new(context, &contracts)?))
}

/// Registry for the ERC-721 approval engine.
pub struct Registry;

impl bundle_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "approval_erc721";
	type Factory = crate::EngineFactory;

	fn factory() -> Self::Factory {
		create_engine
	}
}

impl crate::EngineRegistry for Registry {}
