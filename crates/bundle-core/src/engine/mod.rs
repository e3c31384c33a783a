//! Sponsor engine that runs a transfer from intent to inclusion.
//!
//! [`SponsorEngine::prepare`] asks the transfer engine what to send, sizes
//! the sponsor payment, assembles and signs the bundle and checks it against
//! a relay dry-run. [`SponsorEngine::submit`] then watches the chain and
//! drives the signed bundle through the [`SubmissionLoop`].

pub mod lifecycle;

use crate::bundle::{sign_bundle, BundleAssembler};
use crate::gas::{GasBudget, GasBudgetCalculator};
use crate::simulation::check_simulation;
use crate::submission::{SubmissionLoop, SubmissionOutcome, SubmissionPolicy};
use crate::utils::log_bundle;
use crate::CoreError;
use bundle_account::AccountService;
use bundle_config::Config;
use bundle_delivery::DeliveryService;
use bundle_engine::TransferEngine;
use bundle_relay::RelayService;
use bundle_types::{
	format_gwei, Address, BundleEntry, SignedBundle, SponsoredTransaction, U256,
};
use std::sync::Arc;

/// A signed bundle that passed simulation, with everything used to build it.
#[derive(Debug, Clone)]
pub struct PreparedBundle {
	/// What the transfer engine will move.
	pub description: String,
	/// The engine's transactions, in emission order.
	pub transactions: Vec<SponsoredTransaction>,
	pub budget: GasBudget,
	/// Unsigned entries, sponsor funding first.
	pub entries: Vec<BundleEntry>,
	pub bundle: SignedBundle,
	/// Effective gas price reported by the initial simulation.
	pub simulated_gas_price: U256,
}

/// Coordinates the transfer engine, accounts, chain and relay for one run.
pub struct SponsorEngine {
	pub(crate) config: Config,
	/// Account holding the assets; signs every engine transaction.
	pub(crate) executor: Arc<AccountService>,
	/// Account paying for gas; signs the funding transaction.
	pub(crate) sponsor: Arc<AccountService>,
	pub(crate) delivery: Arc<DeliveryService>,
	pub(crate) relay: Arc<RelayService>,
	pub(crate) transfer: Box<dyn TransferEngine>,
}

impl SponsorEngine {
	pub fn new(
		config: Config,
		executor: Arc<AccountService>,
		sponsor: Arc<AccountService>,
		delivery: Arc<DeliveryService>,
		relay: Arc<RelayService>,
		transfer: Box<dyn TransferEngine>,
	) -> Self {
		Self {
			config,
			executor,
			sponsor,
			delivery,
			relay,
			transfer,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn executor_address(&self) -> Address {
		self.executor.address()
	}

	pub fn sponsor_address(&self) -> Address {
		self.sponsor.address()
	}

	/// Submission parameters taken from configuration.
	pub fn policy(&self) -> SubmissionPolicy {
		SubmissionPolicy {
			blocks_in_future: self.config.submission.blocks_in_future,
			max_attempts: self.config.submission.max_attempts,
		}
	}

	/// Builds, signs and simulates the bundle.
	///
	/// Fails before anything is signed when the engine has nothing to move or
	/// a transaction cannot be estimated, and before the submission loop
	/// when the relay simulation rejects the bundle.
	pub async fn prepare(&self) -> Result<PreparedBundle, CoreError> {
		let description = self
			.transfer
			.description()
			.await
			.map_err(|e| CoreError::Engine(e.to_string()))?;
		let transactions = self
			.transfer
			.sponsored_transactions()
			.await
			.map_err(|e| CoreError::Engine(e.to_string()))?;

		let snapshot = self.initialize().await?;

		let calculator = GasBudgetCalculator::new(
			self.delivery.clone(),
			self.config.submission.priority_fee_gwei,
		);
		let budget = calculator
			.budget(&transactions, self.executor.address())
			.await?;

		let entries = BundleAssembler::new(self.executor.address(), snapshot.chain_id).assemble(
			&budget,
			&transactions,
			snapshot.nonces,
		)?;
		let bundle = sign_bundle(&entries, &self.sponsor, &self.executor).await?;
		log_bundle(&entries, &bundle);

		let simulation = self
			.relay
			.simulate(&bundle, snapshot.head + self.policy().blocks_in_future)
			.await
			.map_err(|e| CoreError::Simulation(e.to_string()))?;
		let simulated_gas_price = check_simulation(&simulation)?;

		for line in description.lines() {
			tracing::info!("{}", line);
		}
		tracing::info!(
			executor = %self.executor.address(),
			sponsor = %self.sponsor.address(),
			simulated_gas_price = %format_gwei(simulated_gas_price),
			gas_price = %format_gwei(U256::from(budget.gas_price)),
			gas_used = budget.total,
			"Bundle ready"
		);

		Ok(PreparedBundle {
			description,
			transactions,
			budget,
			entries,
			bundle,
			simulated_gas_price,
		})
	}

	/// Resubmits a prepared bundle on every new head until a terminal outcome.
	pub async fn submit(&self, prepared: &PreparedBundle) -> Result<SubmissionOutcome, CoreError> {
		let (mut heads, watcher) = self.delivery.watch_heads();
		let mut submission =
			SubmissionLoop::new(self.relay.clone(), prepared.bundle.clone(), self.policy());

		let result = submission.run(&mut heads).await;
		self.shutdown(watcher, submission.attempts().len());
		result
	}

	/// Prepares the bundle and submits it.
	pub async fn run(&self) -> Result<SubmissionOutcome, CoreError> {
		let prepared = self.prepare().await?;
		self.submit(&prepared).await
	}
}
