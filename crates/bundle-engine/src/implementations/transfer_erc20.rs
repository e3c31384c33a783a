//! Single ERC-20 transfer.
//!
//! Moves the holder's entire balance of one token to the recipient.

use crate::abi::{self, IERC20};
use crate::{EngineContext, EngineError, TransferEngine};
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use bundle_delivery::DeliveryService;
use bundle_types::{ConfigSchema, Field, FieldType, Schema, SponsoredTransaction, ValidationError};
use std::sync::Arc;

pub struct TransferErc20 {
	delivery: Arc<DeliveryService>,
	holder: Address,
	recipient: Address,
	token: Address,
}

impl TransferErc20 {
	pub fn new(context: EngineContext, token: &str) -> Result<Self, EngineError> {
		let (holder, recipient) = context.parties()?;
		let token = crate::parse_asset("token", token)?;
		Ok(Self {
			delivery: context.delivery,
			holder,
			recipient,
			token,
		})
	}

	async fn balance(&self) -> Result<U256, EngineError> {
		let balance = abi::balance_of(&self.delivery, self.token, self.holder).await?;
		abi::require_balance(balance, self.token, self.holder)
	}
}

/// Renders one transfer line.
pub(crate) fn describe_transfer(
	balance: U256,
	token: Address,
	holder: Address,
	recipient: Address,
) -> String {
	format!(
		"Transfer ERC20 balance {} @ {} from {} to {}",
		balance, token, holder, recipient
	)
}

/// Builds `transfer(recipient, amount)` on `token`.
pub(crate) fn transfer_call(token: Address, recipient: Address, amount: U256) -> SponsoredTransaction {
	let data = IERC20::transferCall {
		to: recipient,
		amount,
	}
	.abi_encode();
	SponsoredTransaction::call(token, data)
}

/// Configuration schema for the single ERC-20 transfer.
pub struct TransferErc20Schema;

impl ConfigSchema for TransferErc20Schema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![Field::new("token", FieldType::Address)], vec![]).validate(config)
	}
}

#[async_trait]
impl TransferEngine for TransferErc20 {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(TransferErc20Schema)
	}

	async fn description(&self) -> Result<String, EngineError> {
		let balance = self.balance().await?;
		Ok(describe_transfer(
			balance,
			self.token,
			self.holder,
			self.recipient,
		))
	}

	async fn sponsored_transactions(&self) -> Result<Vec<SponsoredTransaction>, EngineError> {
		let balance = self.balance().await?;
		Ok(vec![transfer_call(self.token, self.recipient, balance)])
	}
}

/// Factory function to create the engine from `[engine]` settings.
///
/// Expects a `token` address.
pub fn create_engine(
	config: &toml::Value,
	context: EngineContext,
) -> Result<Box<dyn TransferEngine>, EngineError> {
	context.parties()?;
	TransferErc20Schema
		.validate(config)
		.map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

	let token = config
		.get("token")
		.and_then(|v| v.as_str())
		.ok_or_else(|| EngineError::InvalidConfig("token is required".to_string()))?;

	Ok(Box::new(TransferErc20::new(context, token)?))
}

/// Registry for the single ERC-20 transfer engine.
pub struct Registry;

impl bundle_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "transfer_erc20";
	type Factory = crate::EngineFactory;

	fn factory() -> Self::Factory {
		create_engine
	}
}

impl crate::EngineRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::{context, context_for, settings, MockChain, RECIPIENT};
	use alloy_primitives::address;
	use std::sync::atomic::Ordering;

	const TOKEN: Address = address!("b0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb");

	fn chain_with_balance(balance: u64) -> MockChain {
		let mut chain = MockChain::default();
		chain.balances.insert(TOKEN, U256::from(balance));
		chain
	}

	#[tokio::test]
	async fn test_transfers_entire_balance() {
		let engine = create_engine(
			&settings(r#"token = "0xb0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb""#),
			context(chain_with_balance(1000)),
		)
		.unwrap();

		let txs = engine.sponsored_transactions().await.unwrap();
		assert_eq!(txs.len(), 1);
		assert_eq!(txs[0].to, TOKEN);
		assert!(txs[0].from.is_none());

		let call = IERC20::transferCall::abi_decode(&txs[0].data, true).unwrap();
		assert_eq!(call.amount, U256::from(1000));
		assert_eq!(call.to, RECIPIENT.parse::<Address>().unwrap());

		let description = engine.description().await.unwrap();
		assert!(description.starts_with("Transfer ERC20 balance 1000 @ "));
	}

	#[tokio::test]
	async fn test_zero_balance_is_not_skipped() {
		let engine = TransferErc20::new(
			context(chain_with_balance(0)),
			"0xb0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb",
		)
		.unwrap();

		assert!(matches!(
			engine.sponsored_transactions().await,
			Err(EngineError::NoBalance(_))
		));
		assert!(matches!(engine.description().await, Err(EngineError::NoBalance(_))));
	}

	#[tokio::test]
	async fn test_bad_parties_fail_before_any_call() {
		let chain = chain_with_balance(1000);
		let calls = chain.calls.clone();

		let result = create_engine(
			&settings(r#"token = "0xb0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb""#),
			context_for(chain, "0xnot-an-address", RECIPIENT),
		);
		assert!(matches!(result, Err(EngineError::InvalidAddress(_))));
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[test]
	fn test_missing_token_rejected() {
		let result = create_engine(&settings("tokens = []"), context(MockChain::default()));
		assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
	}
}
