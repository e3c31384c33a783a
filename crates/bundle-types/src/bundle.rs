//! Bundle types for relay submission.
//!
//! A bundle is an ordered, all-or-nothing list of signed transactions. The
//! sponsor funding transaction always comes first because every later entry
//! spends the ETH it supplies.

use crate::{SignedTransaction, UnsignedTransaction};
use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which account signs a bundle entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleRole {
	/// Pays for the bundle's gas by funding the executor.
	Sponsor,
	/// Holds the assets and sends the engine's transactions.
	Executor,
}

impl fmt::Display for BundleRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BundleRole::Sponsor => write!(f, "sponsor"),
			BundleRole::Executor => write!(f, "executor"),
		}
	}
}

/// One unsigned entry of an assembled bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
	pub role: BundleRole,
	pub transaction: UnsignedTransaction,
}

/// A bundle whose entries have all been signed, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBundle {
	pub transactions: Vec<SignedTransaction>,
}

impl SignedBundle {
	pub fn new(transactions: Vec<SignedTransaction>) -> Self {
		Self { transactions }
	}

	/// Raw transactions as hex strings, in bundle order.
	pub fn raw_transactions(&self) -> Vec<String> {
		self.transactions.iter().map(|tx| tx.raw_hex()).collect()
	}

	/// Transaction hashes, in bundle order.
	pub fn hashes(&self) -> Vec<B256> {
		self.transactions.iter().map(|tx| tx.hash).collect()
	}

	/// Each signer paired with the nonce its transaction carries.
	pub fn signer_nonces(&self) -> Vec<(Address, u64)> {
		self.transactions
			.iter()
			.map(|tx| (tx.signer, tx.nonce))
			.collect()
	}

	pub fn len(&self) -> usize {
		self.transactions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.transactions.is_empty()
	}
}

/// How the relay resolved a bundle submitted for one target block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleResolution {
	/// Every bundle transaction landed in the target block.
	BundleIncluded,
	/// The target block was mined without the bundle.
	BlockPassedWithoutInclusion,
	/// A bundle signer's nonce moved past the one the bundle was signed with.
	AccountNonceTooHigh,
}

/// Per-transaction result of a bundle simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSimulation {
	pub tx_hash: Option<B256>,
	pub gas_used: u64,
	pub error: Option<String>,
	pub revert: Option<String>,
}

/// Result of simulating a signed bundle against chain state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
	pub bundle_hash: Option<String>,
	/// Amount the block builder's balance grows by when the bundle executes.
	pub coinbase_diff: U256,
	pub total_gas_used: u64,
	pub results: Vec<TransactionSimulation>,
}

/// A bundle accepted by the relay for a specific block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSubmission {
	pub bundle_hash: Option<String>,
	pub target_block: u64,
	pub bundle: SignedBundle,
}

/// Record of one pass through the submission loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionAttempt {
	/// Chain head that triggered this attempt.
	pub head_block: u64,
	pub target_block: u64,
	/// Effective gas price reported by the simulation for this attempt.
	pub gas_price_used: U256,
	/// Filled in once the relay resolves the target block.
	pub outcome: Option<BundleResolution>,
}
