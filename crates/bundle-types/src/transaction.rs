//! Transaction types for the sponsored bundle pipeline.
//!
//! A transfer engine emits [`SponsoredTransaction`]s, which carry only the call
//! itself. The bundle assembler turns them into fully specified
//! [`UnsignedTransaction`]s, and an account signs those into
//! [`SignedTransaction`]s ready for the relay.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// A transaction request produced by a transfer engine.
///
/// Carries no gas price, gas limit, nonce or signature yet. When `from` is
/// absent the executor account is assumed as sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsoredTransaction {
	/// Contract being called.
	pub to: Address,
	/// ABI-encoded calldata.
	pub data: Bytes,
	/// Native value attached to the call, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<U256>,
	/// Explicit sender, if the engine wants one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<Address>,
}

impl SponsoredTransaction {
	/// Creates a call with no value and no explicit sender.
	pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
		Self {
			to,
			data: data.into(),
			value: None,
			from: None,
		}
	}

	/// Returns the sender to use, falling back to `default_sender`.
	pub fn sender_or(&self, default_sender: Address) -> Address {
		self.from.unwrap_or(default_sender)
	}
}

/// A legacy (gas price) transaction with every field needed for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
	pub to: Address,
	pub data: Bytes,
	pub value: U256,
	pub nonce: u64,
	pub gas_limit: u64,
	pub gas_price: u128,
	pub chain_id: u64,
}

/// A signed transaction in its EIP-2718 encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
	/// Address of the account that signed the transaction.
	pub signer: Address,
	/// Nonce the transaction was signed with.
	pub nonce: u64,
	/// Transaction hash.
	pub hash: B256,
	/// Raw encoded bytes as submitted to the relay.
	pub raw: Bytes,
	pub to: Address,
	pub value: U256,
	pub gas_limit: u64,
	pub gas_price: u128,
}

impl SignedTransaction {
	/// Returns the raw transaction as a 0x-prefixed hex string.
	pub fn raw_hex(&self) -> String {
		format!("0x{}", hex::encode(&self.raw))
	}
}
