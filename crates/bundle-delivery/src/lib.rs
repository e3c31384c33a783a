//! Chain access for the sponsored bundle service.
//!
//! Everything the bundle pipeline reads from the chain goes through the
//! [`DeliveryInterface`]: head and base fee, gas estimates, view calls for
//! asset discovery, nonces and receipts. [`DeliveryService`] wraps one
//! implementation and adds the new-head watcher that drives submission.

use async_trait::async_trait;
use bundle_types::{Address, Bytes, ConfigSchema, ImplementationRegistry, SponsoredTransaction, B256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during chain access.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error that occurs when the node cannot estimate a transaction, usually a revert.
	#[error("Gas estimation failed: {0}")]
	Estimation(String),
	/// Error that occurs when the provider configuration is unusable.
	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),
}

/// Trait defining the interface for chain providers.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Gets the current block number.
	async fn get_block_number(&self) -> Result<u64, DeliveryError>;

	/// Gets the base fee of the latest block, in wei.
	///
	/// Returns `None` on chains without a base fee.
	async fn get_base_fee(&self) -> Result<Option<u128>, DeliveryError>;

	/// Estimates the gas a transaction would use when sent by `from`.
	async fn estimate_gas(
		&self,
		tx: &SponsoredTransaction,
		from: Address,
	) -> Result<u64, DeliveryError>;

	/// Executes a read-only call against the latest state.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError>;

	/// Gets the confirmed transaction count of an account.
	async fn get_nonce(&self, address: Address) -> Result<u64, DeliveryError>;

	/// Gets the block a transaction was included in, if it was.
	async fn get_receipt_block(&self, hash: B256) -> Result<Option<u64>, DeliveryError>;

	/// Gets the chain id of the connected network.
	async fn get_chain_id(&self) -> Result<u64, DeliveryError>;
}

/// Type alias for delivery factory functions.
pub type DeliveryFactory = fn(&toml::Value) -> Result<Box<dyn DeliveryInterface>, DeliveryError>;

/// Registry trait for delivery implementations.
pub trait DeliveryRegistry: ImplementationRegistry<Factory = DeliveryFactory> {}

/// Get all registered delivery implementations.
pub fn get_all_implementations() -> Vec<(&'static str, DeliveryFactory)> {
	use implementations::evm::alloy;

	vec![(alloy::Registry::NAME, alloy::Registry::factory())]
}

/// Service that provides chain access to the rest of the system.
pub struct DeliveryService {
	implementation: Box<dyn DeliveryInterface>,
	/// How often `watch_heads` polls for a new block.
	head_poll_interval: Duration,
}

impl DeliveryService {
	/// Creates a new DeliveryService around a provider implementation.
	pub fn new(implementation: Box<dyn DeliveryInterface>, head_poll_interval: Duration) -> Self {
		Self {
			implementation,
			head_poll_interval,
		}
	}

	pub async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		self.implementation.get_block_number().await
	}

	/// Gets the latest base fee, treating a missing one as zero.
	pub async fn get_base_fee(&self) -> Result<u128, DeliveryError> {
		Ok(self.implementation.get_base_fee().await?.unwrap_or(0))
	}

	pub async fn estimate_gas(
		&self,
		tx: &SponsoredTransaction,
		from: Address,
	) -> Result<u64, DeliveryError> {
		self.implementation.estimate_gas(tx, from).await
	}

	pub async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		self.implementation.call(to, data).await
	}

	pub async fn get_nonce(&self, address: Address) -> Result<u64, DeliveryError> {
		self.implementation.get_nonce(address).await
	}

	pub async fn get_receipt_block(&self, hash: B256) -> Result<Option<u64>, DeliveryError> {
		self.implementation.get_receipt_block(hash).await
	}

	pub async fn get_chain_id(&self) -> Result<u64, DeliveryError> {
		self.implementation.get_chain_id().await
	}

	/// Starts watching for new blocks.
	///
	/// Spawns a task that polls the head and publishes each block number
	/// greater than the last one published. The channel only keeps the newest
	/// head, so a consumer that returns after a slow cycle reads the current
	/// head rather than one that was queued behind it. The initial value is
	/// marked as seen. Polling errors are logged and retried on the next tick.
	/// The task ends when the receiver is dropped.
	pub fn watch_heads(self: &Arc<Self>) -> (watch::Receiver<u64>, JoinHandle<()>) {
		let (tx, rx) = watch::channel(0);
		let service = Arc::clone(self);

		let handle = tokio::spawn(async move {
			let mut interval = tokio::time::interval(service.head_poll_interval);
			interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
			let mut last_emitted: Option<u64> = None;

			loop {
				interval.tick().await;

				let head = match service.get_block_number().await {
					Ok(head) => head,
					Err(e) => {
						tracing::warn!(error = %e, "Failed to poll chain head");
						continue;
					},
				};

				if last_emitted.is_some_and(|last| head <= last) {
					continue;
				}

				tracing::debug!(block = head, "New head");
				if tx.send(head).is_err() {
					tracing::debug!("Head receiver dropped, stopping watcher");
					break;
				}
				last_emitted = Some(head);
			}
		});

		(rx, handle)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use bundle_types::U256;
	use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

	struct NoSchema;

	impl ConfigSchema for NoSchema {
		fn validate(&self, _config: &toml::Value) -> Result<(), bundle_types::ValidationError> {
			Ok(())
		}
	}

	/// Replays a fixed sequence of heads, repeating the last one, or follows
	/// a head the test moves by hand.
	struct ScriptedChain {
		heads: Vec<Result<u64, ()>>,
		polls: AtomicUsize,
		live_head: Option<Arc<AtomicU64>>,
		base_fee: Option<u128>,
	}

	impl ScriptedChain {
		fn new(heads: Vec<Result<u64, ()>>) -> Self {
			Self {
				heads,
				polls: AtomicUsize::new(0),
				live_head: None,
				base_fee: None,
			}
		}

		fn live(head: Arc<AtomicU64>) -> Self {
			Self {
				live_head: Some(head),
				..Self::new(vec![])
			}
		}
	}

	async fn next(heads: &mut watch::Receiver<u64>) -> u64 {
		heads.changed().await.unwrap();
		*heads.borrow_and_update()
	}

	#[async_trait]
	impl DeliveryInterface for ScriptedChain {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(NoSchema)
		}

		async fn get_block_number(&self) -> Result<u64, DeliveryError> {
			if let Some(head) = &self.live_head {
				return Ok(head.load(Ordering::SeqCst));
			}
			let i = self.polls.fetch_add(1, Ordering::SeqCst);
			let step = self.heads.get(i).or(self.heads.last()).cloned();
			match step {
				Some(Ok(head)) => Ok(head),
				_ => Err(DeliveryError::Network("connection reset".into())),
			}
		}

		async fn get_base_fee(&self) -> Result<Option<u128>, DeliveryError> {
			Ok(self.base_fee)
		}

		async fn estimate_gas(
			&self,
			_tx: &SponsoredTransaction,
			_from: Address,
		) -> Result<u64, DeliveryError> {
			Ok(52_000)
		}

		async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes, DeliveryError> {
			Ok(Bytes::from(U256::from(1u64).to_be_bytes_vec()))
		}

		async fn get_nonce(&self, _address: Address) -> Result<u64, DeliveryError> {
			Ok(0)
		}

		async fn get_receipt_block(&self, _hash: B256) -> Result<Option<u64>, DeliveryError> {
			Ok(None)
		}

		async fn get_chain_id(&self) -> Result<u64, DeliveryError> {
			Ok(1)
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_watch_heads_emits_increasing_blocks() {
		let chain = ScriptedChain::new(vec![Ok(10), Ok(10), Err(()), Ok(11), Ok(9), Ok(13)]);
		let service = Arc::new(DeliveryService::new(
			Box::new(chain),
			Duration::from_millis(100),
		));

		let (mut heads, handle) = service.watch_heads();
		assert_eq!(next(&mut heads).await, 10);
		assert_eq!(next(&mut heads).await, 11);
		assert_eq!(next(&mut heads).await, 13);

		drop(heads);
		handle.abort();
	}

	#[tokio::test(start_paused = true)]
	async fn test_slow_consumer_reads_current_head() {
		let chain_head = Arc::new(AtomicU64::new(100));
		let service = Arc::new(DeliveryService::new(
			Box::new(ScriptedChain::live(chain_head.clone())),
			Duration::from_millis(100),
		));

		let (mut heads, handle) = service.watch_heads();
		assert_eq!(next(&mut heads).await, 100);

		// Five blocks are mined while the consumer is busy.
		for _ in 0..5 {
			chain_head.fetch_add(1, Ordering::SeqCst);
			tokio::time::sleep(Duration::from_millis(150)).await;
		}

		assert_eq!(next(&mut heads).await, 105);
		assert!(!heads.has_changed().unwrap());

		drop(heads);
		handle.abort();
	}

	#[tokio::test(start_paused = true)]
	async fn test_watch_heads_stops_when_receiver_dropped() {
		let chain = ScriptedChain::new(vec![Ok(1), Ok(2), Ok(3), Ok(4)]);
		let service = Arc::new(DeliveryService::new(
			Box::new(chain),
			Duration::from_millis(100),
		));

		let (heads, handle) = service.watch_heads();
		drop(heads);
		assert!(handle.await.is_ok());
	}

	#[tokio::test]
	async fn test_missing_base_fee_is_zero() {
		let service = DeliveryService::new(
			Box::new(ScriptedChain::new(vec![Ok(1)])),
			Duration::from_secs(1),
		);
		assert_eq!(service.get_base_fee().await.unwrap(), 0);
	}
}
