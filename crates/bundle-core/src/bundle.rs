//! Bundle assembly and signing.
//!
//! The sponsor funding transaction always sits at index 0: every later entry
//! is sent by the executor and spends the ETH that entry supplies. Assembly
//! is pure; signing happens afterwards, once, and the signed bundle is then
//! reused for every submission.

use crate::gas::GasBudget;
use crate::CoreError;
use bundle_account::AccountService;
use bundle_types::{
	Address, Bytes, BundleEntry, BundleRole, SignedBundle, SponsoredTransaction,
	UnsignedTransaction, PLAIN_TRANSFER_GAS, U256,
};

/// Starting nonces for the two bundle signers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleNonces {
	pub sponsor: u64,
	pub executor: u64,
}

/// Orders and fills in the transactions of a sponsored bundle.
#[derive(Debug, Clone)]
pub struct BundleAssembler {
	executor: Address,
	chain_id: u64,
}

impl BundleAssembler {
	pub fn new(executor: Address, chain_id: u64) -> Self {
		Self { executor, chain_id }
	}

	/// Builds the ordered bundle entries.
	///
	/// The sponsor entry pays `budget.sponsor_amount` to the executor with a
	/// plain transfer gas limit. Engine transactions follow in their given
	/// order, each limited to its own estimate, with consecutive executor
	/// nonces. All entries share `budget.gas_price`.
	pub fn assemble(
		&self,
		budget: &GasBudget,
		transactions: &[SponsoredTransaction],
		nonces: BundleNonces,
	) -> Result<Vec<BundleEntry>, CoreError> {
		if transactions.len() != budget.estimates.len() {
			return Err(CoreError::Estimation(format!(
				"{} transactions but {} gas estimates",
				transactions.len(),
				budget.estimates.len()
			)));
		}

		let funding = BundleEntry {
			role: BundleRole::Sponsor,
			transaction: UnsignedTransaction {
				to: self.executor,
				data: Bytes::new(),
				value: budget.sponsor_amount,
				nonce: nonces.sponsor,
				gas_limit: PLAIN_TRANSFER_GAS,
				gas_price: budget.gas_price,
				chain_id: self.chain_id,
			},
		};

		let sponsored = transactions
			.iter()
			.zip(&budget.estimates)
			.zip(nonces.executor..)
			.map(|((tx, &gas_limit), nonce)| BundleEntry {
				role: BundleRole::Executor,
				transaction: UnsignedTransaction {
					to: tx.to,
					data: tx.data.clone(),
					value: tx.value.unwrap_or(U256::ZERO),
					nonce,
					gas_limit,
					gas_price: budget.gas_price,
					chain_id: self.chain_id,
				},
			});

		Ok(std::iter::once(funding).chain(sponsored).collect())
	}
}

/// Signs every entry with the account its role names, keeping bundle order.
pub async fn sign_bundle(
	entries: &[BundleEntry],
	sponsor: &AccountService,
	executor: &AccountService,
) -> Result<SignedBundle, CoreError> {
	let mut signed = Vec::with_capacity(entries.len());
	for (i, entry) in entries.iter().enumerate() {
		let signer = match entry.role {
			BundleRole::Sponsor => sponsor,
			BundleRole::Executor => executor,
		};
		let tx = signer
			.sign(&entry.transaction)
			.await
			.map_err(|e| CoreError::Signing(format!("TX #{} ({}): {}", i, entry.role, e)))?;
		signed.push(tx);
	}
	Ok(SignedBundle::new(signed))
}
