//! Gas budgeting for a sponsored bundle.
//!
//! Every executor transaction is estimated on its own, and the sponsor pays
//! exactly the sum of those estimates at one shared gas price. The estimates
//! computed here are also the gas limits the assembler gives each entry, so
//! the funding amount and the limits can never disagree within a cycle.

use crate::CoreError;
use alloy_primitives::U256;
use bundle_delivery::DeliveryService;
use bundle_types::{format_gwei, Address, SponsoredTransaction, GWEI};
use futures::future::try_join_all;
use std::sync::Arc;

/// Gas estimates for one set of transactions and the payment that covers them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasBudget {
	/// One estimate per transaction, in transaction order.
	pub estimates: Vec<u64>,
	/// Sum of all estimates.
	pub total: u64,
	/// Price every bundle entry pays, in wei per gas.
	pub gas_price: u128,
	/// Value of the sponsor funding transaction: `total * gas_price`.
	pub sponsor_amount: U256,
}

impl GasBudget {
	/// Computes the budget for known estimates at a known price.
	///
	/// Fails when the estimates do not fit in a `u64` total.
	pub fn new(estimates: Vec<u64>, gas_price: u128) -> Result<Self, CoreError> {
		let total = estimates
			.iter()
			.try_fold(0u64, |total, gas| total.checked_add(*gas))
			.ok_or_else(|| {
				CoreError::Estimation(format!("Total gas overflows: {:?}", estimates))
			})?;
		let sponsor_amount = U256::from(total) * U256::from(gas_price);
		Ok(Self {
			estimates,
			total,
			gas_price,
			sponsor_amount,
		})
	}
}

/// Estimates gas and prices it at the base fee plus a fixed premium.
pub struct GasBudgetCalculator {
	delivery: Arc<DeliveryService>,
	/// Premium over the base fee, in wei.
	priority_fee: u128,
}

impl GasBudgetCalculator {
	pub fn new(delivery: Arc<DeliveryService>, priority_fee_gwei: u64) -> Self {
		Self {
			delivery,
			priority_fee: u128::from(priority_fee_gwei) * GWEI,
		}
	}

	/// Estimates every transaction concurrently.
	///
	/// Transactions without an explicit sender are estimated as sent by
	/// `executor`. Results keep the input order. Any single failure fails
	/// the whole set.
	pub async fn estimate(
		&self,
		transactions: &[SponsoredTransaction],
		executor: Address,
	) -> Result<Vec<u64>, CoreError> {
		let estimates = transactions.iter().enumerate().map(|(i, tx)| async move {
			self.delivery
				.estimate_gas(tx, tx.sender_or(executor))
				.await
				.map_err(|e| CoreError::Estimation(format!("TX #{}: {}", i, e)))
		});

		try_join_all(estimates).await
	}

	/// Current gas price: the latest base fee plus the premium.
	pub async fn gas_price(&self) -> Result<u128, CoreError> {
		let base_fee = self
			.delivery
			.get_base_fee()
			.await
			.map_err(|e| CoreError::Estimation(format!("Failed to read base fee: {}", e)))?;
		base_fee
			.checked_add(self.priority_fee)
			.ok_or_else(|| CoreError::Estimation(format!("Base fee out of range: {}", base_fee)))
	}

	/// Estimates the transactions and prices them in one step.
	pub async fn budget(
		&self,
		transactions: &[SponsoredTransaction],
		executor: Address,
	) -> Result<GasBudget, CoreError> {
		let estimates = self.estimate(transactions, executor).await?;
		let gas_price = self.gas_price().await?;
		let budget = GasBudget::new(estimates, gas_price)?;

		tracing::debug!(
			total_gas = budget.total,
			gas_price = %format_gwei(U256::from(budget.gas_price)),
			sponsor_amount = %budget.sponsor_amount,
			"Computed gas budget"
		);
		Ok(budget)
	}
}
