//! Block-builder relay client for the sponsored bundle service.
//!
//! A relay accepts signed bundles for a specific target block, can simulate a
//! bundle against recent state, and is the source of truth for whether a
//! submitted bundle made it on chain.

use async_trait::async_trait;
use bundle_account::AccountService;
use bundle_delivery::DeliveryService;
use bundle_types::{
	BundleResolution, BundleSubmission, ConfigSchema, ImplementationRegistry, SignedBundle,
	SimulationResult,
};
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod flashbots;
}

/// Errors that can occur while talking to a relay.
#[derive(Debug, Error)]
pub enum RelayError {
	/// Error that occurs during HTTP transport.
	#[error("HTTP error: {0}")]
	Http(String),
	/// The relay answered with a JSON-RPC error object.
	#[error("Relay rejected request ({code}): {message}")]
	Rejected { code: i64, message: String },
	/// The relay answered with something that is not the expected shape.
	#[error("Invalid relay response: {0}")]
	InvalidResponse(String),
	/// Error that occurs when authenticating a request.
	#[error("Signing failed: {0}")]
	Signing(String),
	/// Error that occurs while reading chain state to resolve a submission.
	#[error("Chain error: {0}")]
	Chain(String),
	/// Error that occurs when the relay configuration is unusable.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

/// Trait defining the interface for relay clients.
#[async_trait]
pub trait RelayInterface: Send + Sync {
	/// Returns the configuration schema for this relay implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Simulates a signed bundle as if it were mined in `block_number`.
	async fn simulate(
		&self,
		bundle: &SignedBundle,
		block_number: u64,
	) -> Result<SimulationResult, RelayError>;

	/// Submits a signed bundle for inclusion in `target_block`.
	async fn send_bundle(
		&self,
		bundle: &SignedBundle,
		target_block: u64,
	) -> Result<BundleSubmission, RelayError>;

	/// Waits until the target block of a submission is mined and reports
	/// what happened to the bundle.
	async fn wait(&self, submission: &BundleSubmission) -> Result<BundleResolution, RelayError>;
}

/// Type alias for relay factory functions.
///
/// Relays get the account that authenticates submissions and the chain
/// access used to resolve them.
pub type RelayFactory = fn(
	&toml::Value,
	Arc<AccountService>,
	Arc<DeliveryService>,
) -> Result<Box<dyn RelayInterface>, RelayError>;

/// Registry trait for relay implementations.
pub trait RelayRegistry: ImplementationRegistry<Factory = RelayFactory> {}

/// Get all registered relay implementations.
pub fn get_all_implementations() -> Vec<(&'static str, RelayFactory)> {
	use implementations::flashbots;

	vec![(flashbots::Registry::NAME, flashbots::Registry::factory())]
}

/// Service that manages bundle submission through a relay.
pub struct RelayService {
	implementation: Box<dyn RelayInterface>,
}

impl RelayService {
	/// Creates a new RelayService with the specified implementation.
	pub fn new(implementation: Box<dyn RelayInterface>) -> Self {
		Self { implementation }
	}

	pub async fn simulate(
		&self,
		bundle: &SignedBundle,
		block_number: u64,
	) -> Result<SimulationResult, RelayError> {
		self.implementation.simulate(bundle, block_number).await
	}

	pub async fn send_bundle(
		&self,
		bundle: &SignedBundle,
		target_block: u64,
	) -> Result<BundleSubmission, RelayError> {
		self.implementation.send_bundle(bundle, target_block).await
	}

	pub async fn wait(&self, submission: &BundleSubmission) -> Result<BundleResolution, RelayError> {
		self.implementation.wait(submission).await
	}
}
