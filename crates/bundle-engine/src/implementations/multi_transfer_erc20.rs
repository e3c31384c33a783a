//! Multi-token ERC-20 transfer.
//!
//! Moves the holder's entire balance of each configured token to the
//! recipient, one transfer per token. Balances are queried concurrently and
//! results keep the configured token order.

use super::transfer_erc20::{describe_transfer, transfer_call};
use crate::abi;
use crate::{EngineContext, EngineError, TransferEngine};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use bundle_delivery::DeliveryService;
use bundle_types::{
	non_empty_array, ConfigSchema, Field, FieldType, Schema, SponsoredTransaction, ValidationError,
};
use futures::future::try_join_all;
use std::sync::Arc;

pub struct MultiTransferErc20 {
	delivery: Arc<DeliveryService>,
	holder: Address,
	recipient: Address,
	tokens: Vec<Address>,
}

impl MultiTransferErc20 {
	pub fn new(context: EngineContext, tokens: &[&str]) -> Result<Self, EngineError> {
		let (holder, recipient) = context.parties()?;
		if tokens.is_empty() {
			return Err(EngineError::InvalidConfig(
				"at least one token is required".to_string(),
			));
		}
		let tokens = tokens
			.iter()
			.enumerate()
			.map(|(i, token)| crate::parse_asset(&format!("tokens[{}]", i), token))
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			delivery: context.delivery,
			holder,
			recipient,
			tokens,
		})
	}

	/// Non-zero balance of every token, in token order.
	async fn balances(&self) -> Result<Vec<(Address, U256)>, EngineError> {
		try_join_all(self.tokens.iter().map(|&token| async move {
			let balance = abi::balance_of(&self.delivery, token, self.holder).await?;
			let balance = abi::require_balance(balance, token, self.holder)?;
			Ok::<_, EngineError>((token, balance))
		}))
		.await
	}
}

/// Configuration schema for the multi-token ERC-20 transfer.
pub struct MultiTransferErc20Schema;

impl ConfigSchema for MultiTransferErc20Schema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![
				Field::new("tokens", FieldType::Array(Box::new(FieldType::Address)))
					.with_validator(non_empty_array),
			],
			vec![],
		)
		.validate(config)
	}
}

#[async_trait]
impl TransferEngine for MultiTransferErc20 {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MultiTransferErc20Schema)
	}

	async fn description(&self) -> Result<String, EngineError> {
		let lines: Vec<String> = self
			.balances()
			.await?
			.into_iter()
			.map(|(token, balance)| describe_transfer(balance, token, self.holder, self.recipient))
			.collect();
		Ok(lines.join("\n"))
	}

	async fn sponsored_transactions(&self) -> Result<Vec<SponsoredTransaction>, EngineError> {
		Ok(self
			.balances()
			.await?
			.into_iter()
			.map(|(token, balance)| transfer_call(token, self.recipient, balance))
			.collect())
	}
}

/// Factory function to create the engine from `[engine]` settings.
///
/// Expects a non-empty `tokens` array of addresses.
pub fn create_engine(
	config: &toml::Value,
	context: EngineContext,
) -> Result<Box<dyn TransferEngine>, EngineError> {
	context.parties()?;
	MultiTransferErc20Schema
		.validate(config)
		.map_err(|e| EngineError::InvalidConfig(e.to_string()))?;

	let tokens: Vec<&str> = config
		.get("tokens")
		.and_then(|v| v.as_array())
		.map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
		.unwrap_or_default();

	Ok(Box::new(MultiTransferErc20::new(context, &tokens)?))
}

/// Registry for the multi-token ERC-20 transfer engine.
pub struct Registry;

impl bundle_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "multi_transfer_erc20";
	type Factory = crate::EngineFactory;

	fn factory() -> Self::Factory {
		create_engine
	}
}

impl crate::EngineRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::abi::IERC20;
	use crate::test_utils::{context, settings, MockChain};
	use alloy_primitives::address;
	use alloy_sol_types::SolCall;
	use std::time::Duration;

	const TOKEN_A: Address = address!("b0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb");
	const TOKEN_B: Address = address!("5f1f8dfe9a81480d6a1d17e7d5d93fba5611783b");
	const TOKEN_C: Address = address!("3cdfce5c7c6e7c2bc1ff6e1b3ed1fef18ac0a8f1");

	const CONFIG: &str = r#"tokens = [
	"0xb0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb",
	"0x5f1f8dfe9a81480d6a1d17e7d5d93fba5611783b",
	"0x3cdfce5c7c6e7c2bc1ff6e1b3ed1fef18ac0a8f1",
]"#;

	/// First token answers slowest, last token fastest.
	fn reversed_latency_chain() -> MockChain {
		let mut chain = MockChain::default();
		chain.balances.insert(TOKEN_A, U256::from(100));
		chain.balances.insert(TOKEN_B, U256::from(200));
		chain.balances.insert(TOKEN_C, U256::from(300));
		chain.delays.insert(TOKEN_A, Duration::from_millis(30));
		chain.delays.insert(TOKEN_B, Duration::from_millis(20));
		chain.delays.insert(TOKEN_C, Duration::from_millis(10));
		chain
	}

	#[tokio::test(start_paused = true)]
	async fn test_output_order_matches_token_order() {
		let engine = create_engine(&settings(CONFIG), context(reversed_latency_chain())).unwrap();

		let txs = engine.sponsored_transactions().await.unwrap();
		let targets: Vec<Address> = txs.iter().map(|tx| tx.to).collect();
		assert_eq!(targets, vec![TOKEN_A, TOKEN_B, TOKEN_C]);

		let amounts: Vec<U256> = txs
			.iter()
			.map(|tx| IERC20::transferCall::abi_decode(&tx.data, true).unwrap().amount)
			.collect();
		assert_eq!(amounts, vec![U256::from(100), U256::from(200), U256::from(300)]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_description_mentions_every_token() {
		let engine = create_engine(&settings(CONFIG), context(reversed_latency_chain())).unwrap();

		let description = engine.description().await.unwrap();
		let lines: Vec<&str> = description.lines().collect();
		assert_eq!(lines.len(), 3);
		for (line, token) in lines.iter().zip([TOKEN_A, TOKEN_B, TOKEN_C]) {
			assert!(line.contains(&token.to_string()), "{} missing {}", line, token);
		}
		assert!(lines[1].starts_with("Transfer ERC20 balance 200 @ "));
	}

	#[tokio::test]
	async fn test_one_empty_token_fails_everything() {
		let mut chain = MockChain::default();
		chain.balances.insert(TOKEN_A, U256::from(1000));
		chain.balances.insert(TOKEN_B, U256::ZERO);

		let engine = MultiTransferErc20::new(
			context(chain),
			&[
				"0xb0c0f148fb8d943ea8e2c5bd87034dd5f39e16eb",
				"0x5f1f8dfe9a81480d6a1d17e7d5d93fba5611783b",
			],
		)
		.unwrap();

		assert!(matches!(
			engine.sponsored_transactions().await,
			Err(EngineError::NoBalance(ref m)) if m.contains(&TOKEN_B.to_string())
		));
		assert!(matches!(engine.description().await, Err(EngineError::NoBalance(_))));
	}

	#[test]
	fn test_empty_token_list_rejected() {
		assert!(matches!(
			create_engine(&settings("tokens = []"), context(MockChain::default())),
			Err(EngineError::InvalidConfig(_))
		));
		assert!(matches!(
			MultiTransferErc20::new(context(MockChain::default()), &["0x1234"]),
			Err(EngineError::InvalidAddress(_))
		));
	}
}
