//! Startup and shutdown of a sponsor run.
//!
//! Reads the chain state the bundle is built against once, and stops the
//! head watcher when submission ends.

use super::SponsorEngine;
use crate::bundle::BundleNonces;
use crate::CoreError;
use tokio::task::JoinHandle;

/// Chain state a bundle is signed against.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChainSnapshot {
	pub head: u64,
	pub chain_id: u64,
	pub nonces: BundleNonces,
}

impl SponsorEngine {
	/// Reads the head, the chain id and both signers' nonces.
	///
	/// A chain id set in configuration is used as-is; otherwise the node is
	/// asked.
	pub(crate) async fn initialize(&self) -> Result<ChainSnapshot, CoreError> {
		tracing::info!(
			executor = %self.executor.address(),
			sponsor = %self.sponsor.address(),
			"Initializing sponsor engine"
		);

		let chain_id = async {
			match self.config.network.chain_id {
				Some(id) => Ok(id),
				None => self.delivery.get_chain_id().await,
			}
		};

		let (head, chain_id, sponsor, executor) = tokio::try_join!(
			self.delivery.get_block_number(),
			chain_id,
			self.delivery.get_nonce(self.sponsor.address()),
			self.delivery.get_nonce(self.executor.address()),
		)
		.map_err(|e| CoreError::Config(format!("Failed to read chain state: {}", e)))?;

		tracing::debug!(head, chain_id, sponsor_nonce = sponsor, executor_nonce = executor, "Read chain state");
		Ok(ChainSnapshot {
			head,
			chain_id,
			nonces: BundleNonces { sponsor, executor },
		})
	}

	/// Stops the head watcher.
	pub(crate) fn shutdown(&self, watcher: JoinHandle<()>, attempts: usize) {
		watcher.abort();
		tracing::info!(attempts, "Stopped submission");
	}
}
