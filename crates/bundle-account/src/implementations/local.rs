//! Local private-key account.
//!
//! Signs legacy transactions and personal messages in-process with a
//! secp256k1 key taken from configuration.

use crate::{AccountError, AccountInterface};
use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSignerSync;
use alloy_primitives::{Bytes, TxKind};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use bundle_types::{
	Address, ConfigSchema, Field, FieldType, Schema, SignedTransaction, UnsignedTransaction,
	ValidationError,
};

/// Account backed by a private key held in memory.
pub struct LocalAccount {
	signer: PrivateKeySigner,
}

impl LocalAccount {
	/// Creates an account from a hex private key, with or without `0x`.
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.trim()
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;
		Ok(Self { signer })
	}
}

/// Configuration schema for the local account.
pub struct LocalAccountSchema;

impl ConfigSchema for LocalAccountSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(key) if key.trim().is_empty() => {
						Err("private_key cannot be empty".to_string())
					},
					Some(_) => Ok(()),
					None => Err("private_key must be a string".to_string()),
				}
			})],
			vec![],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalAccountSchema)
	}

	async fn address(&self) -> Result<Address, AccountError> {
		Ok(self.signer.address())
	}

	async fn sign_transaction(
		&self,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, AccountError> {
		let mut legacy = TxLegacy {
			chain_id: Some(tx.chain_id),
			nonce: tx.nonce,
			gas_price: tx.gas_price,
			gas_limit: tx.gas_limit,
			to: TxKind::Call(tx.to),
			value: tx.value,
			input: tx.data.clone(),
		};

		let signature = TxSignerSync::sign_transaction_sync(&self.signer, &mut legacy)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		let envelope: TxEnvelope = legacy.into_signed(signature).into();

		Ok(SignedTransaction {
			signer: self.signer.address(),
			nonce: tx.nonce,
			hash: *envelope.tx_hash(),
			raw: Bytes::from(envelope.encoded_2718()),
			to: tx.to,
			value: tx.value,
			gas_limit: tx.gas_limit,
			gas_price: tx.gas_price,
		})
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, AccountError> {
		let signature = self
			.signer
			.sign_message_sync(message)
			.map_err(|e| AccountError::SigningFailed(e.to_string()))?;
		Ok(signature.as_bytes().to_vec())
	}
}

/// Factory function to create a local account from configuration.
///
/// Expects a `private_key` string field.
pub fn create_account(config: &toml::Value) -> Result<Box<dyn AccountInterface>, AccountError> {
	LocalAccountSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(format!("Invalid configuration: {}", e)))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".to_string()))?;

	Ok(Box::new(LocalAccount::new(private_key)?))
}

/// Registry for the local account implementation.
pub struct Registry;

impl bundle_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::AccountFactory;

	fn factory() -> Self::Factory {
		create_account
	}
}

impl crate::AccountRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::AccountService;
	use alloy_primitives::{address, keccak256, U256};

	// Well-known development keys.
	const EXECUTOR_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
	const SPONSOR_KEY: &str = "5de4111afa1a4b94908f83103eb1f1706367c2e68ca870fc3fb9a804cdab365a";

	fn key_config(key: &str) -> toml::Value {
		let mut table = toml::map::Map::new();
		table.insert("private_key".to_string(), toml::Value::String(key.to_string()));
		toml::Value::Table(table)
	}

	fn sponsor_payment(nonce: u64) -> UnsignedTransaction {
		UnsignedTransaction {
			to: address!("70997970C51812dc3A010C7d01b50e0d17dc79C8"),
			data: Bytes::new(),
			value: U256::from(1_560_000_000_000_000u64),
			nonce,
			gas_limit: 21_000,
			gas_price: 30_000_000_000,
			chain_id: 1,
		}
	}

	#[tokio::test]
	async fn test_address_from_key() {
		let executor = create_account(&key_config(EXECUTOR_KEY)).unwrap();
		assert_eq!(
			executor.address().await.unwrap(),
			address!("70997970C51812dc3A010C7d01b50e0d17dc79C8")
		);

		// Keys without the 0x prefix are accepted too.
		let sponsor = create_account(&key_config(SPONSOR_KEY)).unwrap();
		assert_eq!(
			sponsor.address().await.unwrap(),
			address!("3C44CdDdB6a900fa2b585dd299e03d12FA4293BC")
		);
	}

	#[test]
	fn test_invalid_key_rejected() {
		assert!(matches!(
			create_account(&key_config("0x1234")),
			Err(AccountError::InvalidKey(_))
		));
		assert!(matches!(
			create_account(&key_config("  ")),
			Err(AccountError::InvalidKey(_))
		));
		assert!(create_account(&toml::Value::Table(toml::map::Map::new())).is_err());
	}

	#[tokio::test]
	async fn test_signed_transaction_is_legacy_rlp() {
		let sponsor = AccountService::new(create_account(&key_config(SPONSOR_KEY)).unwrap())
			.await
			.unwrap();
		let tx = sponsor_payment(7);
		let signed = sponsor.sign(&tx).await.unwrap();

		assert_eq!(signed.signer, sponsor.address());
		assert_eq!(signed.nonce, 7);
		assert_eq!(signed.gas_limit, 21_000);
		// Legacy encoding is a bare RLP list, hashed as a whole.
		assert!(signed.raw[0] >= 0xc0);
		assert_eq!(signed.hash, keccak256(&signed.raw));
	}

	#[tokio::test]
	async fn test_signing_is_deterministic_per_nonce() {
		let account = LocalAccount::new(SPONSOR_KEY).unwrap();
		let first = account.sign_transaction(&sponsor_payment(0)).await.unwrap();
		let again = account.sign_transaction(&sponsor_payment(0)).await.unwrap();
		let next = account.sign_transaction(&sponsor_payment(1)).await.unwrap();

		assert_eq!(first.raw, again.raw);
		assert_ne!(first.hash, next.hash);
	}

	#[tokio::test]
	async fn test_message_signature_shape() {
		let account = LocalAccount::new(EXECUTOR_KEY).unwrap();
		let signature = account.sign_message(b"0xabcdef").await.unwrap();
		assert_eq!(signature.len(), 65);
		assert!(signature[64] == 27 || signature[64] == 28);
	}
}
