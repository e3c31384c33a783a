//! Block-by-block bundle submission.
//!
//! One signed bundle is resubmitted on every new chain head, each time aimed
//! at a block a fixed distance ahead, until the relay reports it included or
//! reports a conflict that makes the signed bundle unusable.
//!
//! A cycle runs to resolution before the next head is read, so at most one
//! submission is ever in flight. The head channel only holds the newest head,
//! so blocks mined during a cycle collapse into the current one, and a head
//! not newer than the last one used is ignored, which keeps target blocks
//! strictly increasing. Each cycle simulates against the block it bids on.

use crate::simulation::check_simulation;
use crate::CoreError;
use bundle_relay::RelayService;
use bundle_types::{format_gwei, BundleResolution, SignedBundle, SubmissionAttempt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::instrument;

/// Retry parameters of the submission loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionPolicy {
	/// Distance between the triggering head and the target block.
	pub blocks_in_future: u64,
	/// Upper bound on attempts; `None` retries until a terminal outcome.
	pub max_attempts: Option<u64>,
}

impl Default for SubmissionPolicy {
	fn default() -> Self {
		Self {
			blocks_in_future: 2,
			max_attempts: None,
		}
	}
}

/// How a submission run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
	/// The bundle landed in `block`.
	Included { block: u64 },
	/// A signer's nonce moved past the bundle; resubmitting cannot help.
	NonceTooHigh,
	/// `max_attempts` attempts were made without inclusion.
	Exhausted,
}

impl SubmissionOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, SubmissionOutcome::Included { .. })
	}
}

/// States of the submission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
	/// Waiting for the next chain head.
	Idle,
	/// Simulating and sending the bundle for a new head.
	Submitting,
	/// Waiting for the relay to resolve the target block.
	AwaitingResolution,
	/// A terminal outcome was reached.
	Finished(SubmissionOutcome),
}

/// Resubmits a signed bundle on each new head until a terminal outcome.
pub struct SubmissionLoop {
	relay: Arc<RelayService>,
	bundle: SignedBundle,
	policy: SubmissionPolicy,
	state: SubmissionState,
	attempts: Vec<SubmissionAttempt>,
	last_head: Option<u64>,
}

impl SubmissionLoop {
	/// Creates a loop for a bundle that has already passed simulation.
	pub fn new(relay: Arc<RelayService>, bundle: SignedBundle, policy: SubmissionPolicy) -> Self {
		Self {
			relay,
			bundle,
			policy,
			state: SubmissionState::Idle,
			attempts: Vec::new(),
			last_head: None,
		}
	}

	pub fn state(&self) -> SubmissionState {
		self.state
	}

	/// Every attempt made so far, oldest first.
	pub fn attempts(&self) -> &[SubmissionAttempt] {
		&self.attempts
	}

	/// Consumes heads until the bundle is included or cannot be.
	///
	/// Non-inclusion is absorbed and retried on the next head. Simulation and
	/// relay errors end the run, as does the head stream closing.
	pub async fn run(
		&mut self,
		heads: &mut watch::Receiver<u64>,
	) -> Result<SubmissionOutcome, CoreError> {
		loop {
			if let Some(max) = self.policy.max_attempts {
				if self.attempts.len() as u64 >= max {
					tracing::warn!(attempts = self.attempts.len(), "Giving up, attempts exhausted");
					return Ok(self.finish(SubmissionOutcome::Exhausted));
				}
			}

			let head = next_head(heads).await.ok_or(CoreError::HeadStreamClosed)?;
			if self.last_head.is_some_and(|last| head <= last) {
				tracing::debug!(block = head, "Ignoring stale head");
				continue;
			}
			self.last_head = Some(head);

			let (target_block, resolution) = self.cycle(head).await?;
			match resolution {
				BundleResolution::BundleIncluded => {
					tracing::info!(target_block, "Congrats, included in {}", target_block);
					return Ok(self.finish(SubmissionOutcome::Included {
						block: target_block,
					}));
				},
				BundleResolution::BlockPassedWithoutInclusion => {
					tracing::info!(target_block, "Not included in {}", target_block);
					self.state = SubmissionState::Idle;
				},
				BundleResolution::AccountNonceTooHigh => {
					tracing::error!(target_block, "Nonce too high, bailing");
					return Ok(self.finish(SubmissionOutcome::NonceTooHigh));
				},
			}
		}
	}

	/// Runs one attempt for `head`: simulate, send, then wait for the target.
	#[instrument(skip_all, fields(head))]
	async fn cycle(&mut self, head: u64) -> Result<(u64, BundleResolution), CoreError> {
		self.state = SubmissionState::Submitting;

		let target_block = head + self.policy.blocks_in_future;
		let simulation = self
			.relay
			.simulate(&self.bundle, target_block)
			.await
			.map_err(|e| CoreError::Simulation(e.to_string()))?;
		let gas_price = check_simulation(&simulation)?;

		tracing::info!(
			current_block = head,
			target_block,
			gas_price = %format_gwei(gas_price),
			"Submitting bundle"
		);
		self.attempts.push(SubmissionAttempt {
			head_block: head,
			target_block,
			gas_price_used: gas_price,
			outcome: None,
		});

		let submission = self
			.relay
			.send_bundle(&self.bundle, target_block)
			.await
			.map_err(|e| CoreError::Submission(e.to_string()))?;

		self.state = SubmissionState::AwaitingResolution;
		let resolution = self
			.relay
			.wait(&submission)
			.await
			.map_err(|e| CoreError::Submission(e.to_string()))?;

		if let Some(attempt) = self.attempts.last_mut() {
			attempt.outcome = Some(resolution);
		}
		Ok((target_block, resolution))
	}

	fn finish(&mut self, outcome: SubmissionOutcome) -> SubmissionOutcome {
		self.state = SubmissionState::Finished(outcome);
		outcome
	}
}

/// Waits for a head not yet seen and returns the newest one published.
async fn next_head(heads: &mut watch::Receiver<u64>) -> Option<u64> {
	heads.changed().await.ok()?;
	let head = *heads.borrow_and_update();
	Some(head)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::{relay, MockRelay};
	use bundle_types::{BundleResolution::*, U256, GWEI};

	/// Publishes `initial` in order, leaving only the last one unseen.
	fn heads(initial: &[u64]) -> (watch::Sender<u64>, watch::Receiver<u64>) {
		let (tx, rx) = watch::channel(0);
		for head in initial {
			tx.send_replace(*head);
		}
		(tx, rx)
	}

	fn submission_loop(mock: MockRelay, policy: SubmissionPolicy) -> SubmissionLoop {
		let (relay, _) = relay(mock);
		SubmissionLoop::new(relay, SignedBundle::default(), policy)
	}

	#[tokio::test]
	async fn test_retries_until_included() {
		let (tx, mut rx) = heads(&[100]);
		let mock = MockRelay::new(vec![
			BlockPassedWithoutInclusion,
			BlockPassedWithoutInclusion,
			BlockPassedWithoutInclusion,
			BundleIncluded,
		])
		.feeding(tx, vec![vec![101], vec![102], vec![103]]);
		let log = mock.log.clone();
		let mut submission = submission_loop(mock, SubmissionPolicy::default());

		let outcome = submission.run(&mut rx).await.unwrap();

		assert_eq!(outcome, SubmissionOutcome::Included { block: 105 });
		assert_eq!(
			submission.state(),
			SubmissionState::Finished(SubmissionOutcome::Included { block: 105 })
		);

		let attempts = submission.attempts();
		assert_eq!(attempts.len(), 4);
		let targets: Vec<u64> = attempts.iter().map(|a| a.target_block).collect();
		assert_eq!(targets, vec![102, 103, 104, 105]);
		assert!(targets.windows(2).all(|w| w[0] < w[1]));
		assert_eq!(attempts[0].outcome, Some(BlockPassedWithoutInclusion));
		assert_eq!(attempts[3].outcome, Some(BundleIncluded));
		assert!(attempts
			.iter()
			.all(|a| a.gas_price_used == U256::from(30 * GWEI)));

		let log = log.lock().unwrap();
		assert_eq!(log.simulated, vec![102, 103, 104, 105]);
		assert_eq!(log.sent, vec![102, 103, 104, 105]);
	}

	#[tokio::test]
	async fn test_nonce_too_high_stops_immediately() {
		let (tx, mut rx) = heads(&[100]);
		let mock = MockRelay::new(vec![AccountNonceTooHigh]).feeding(tx, vec![vec![101, 102]]);
		let log = mock.log.clone();
		let mut submission = submission_loop(mock, SubmissionPolicy::default());

		let outcome = submission.run(&mut rx).await.unwrap();

		assert_eq!(outcome, SubmissionOutcome::NonceTooHigh);
		assert!(!outcome.is_success());
		assert_eq!(submission.attempts().len(), 1);
		assert_eq!(log.lock().unwrap().sent, vec![102]);
	}

	#[tokio::test]
	async fn test_published_heads_collapse_to_newest() {
		let (_tx, mut rx) = heads(&[100, 101, 105]);
		let mut submission = submission_loop(
			MockRelay::new(vec![BundleIncluded]),
			SubmissionPolicy::default(),
		);

		let outcome = submission.run(&mut rx).await.unwrap();

		assert_eq!(outcome, SubmissionOutcome::Included { block: 107 });
		assert_eq!(submission.attempts().len(), 1);
		assert_eq!(submission.attempts()[0].head_block, 105);
	}

	#[tokio::test]
	async fn test_slow_cycle_targets_current_head() {
		let (tx, mut rx) = heads(&[100]);
		// Three blocks are mined while the first attempt waits for its target.
		let mock = MockRelay::new(vec![BlockPassedWithoutInclusion, BundleIncluded])
			.feeding(tx, vec![vec![101, 102, 103]]);
		let log = mock.log.clone();
		let mut submission = submission_loop(mock, SubmissionPolicy::default());

		let outcome = submission.run(&mut rx).await.unwrap();

		assert_eq!(outcome, SubmissionOutcome::Included { block: 105 });
		let heads: Vec<u64> = submission.attempts().iter().map(|a| a.head_block).collect();
		assert_eq!(heads, vec![100, 103]);
		let log = log.lock().unwrap();
		assert_eq!(log.simulated, vec![102, 105]);
		assert_eq!(log.sent, vec![102, 105]);
	}

	#[tokio::test]
	async fn test_stale_heads_are_ignored() {
		let (tx, mut rx) = heads(&[100]);
		let mock = MockRelay::new(vec![BlockPassedWithoutInclusion])
			.feeding(tx, vec![vec![98, 100]]);
		let log = mock.log.clone();
		let mut submission = submission_loop(mock, SubmissionPolicy::default());

		// The only later heads are stale, then the stream ends.
		let err = submission.run(&mut rx).await.unwrap_err();

		assert!(matches!(err, CoreError::HeadStreamClosed));
		assert_eq!(submission.attempts().len(), 1);
		assert_eq!(log.lock().unwrap().sent, vec![102]);
	}

	#[tokio::test]
	async fn test_max_attempts_exhausts() {
		let (tx, mut rx) = heads(&[100]);
		let mock = MockRelay::new(vec![]).feeding(tx, vec![vec![101], vec![102], vec![103]]);
		let policy = SubmissionPolicy {
			blocks_in_future: 3,
			max_attempts: Some(2),
		};
		let mut submission = submission_loop(mock, policy);

		let outcome = submission.run(&mut rx).await.unwrap();

		assert_eq!(outcome, SubmissionOutcome::Exhausted);
		let targets: Vec<u64> = submission.attempts().iter().map(|a| a.target_block).collect();
		assert_eq!(targets, vec![103, 104]);
	}

	#[tokio::test]
	async fn test_relay_rejection_is_fatal() {
		let (_tx, mut rx) = heads(&[100]);
		let mut mock = MockRelay::new(vec![]);
		mock.reject_send = true;
		let log = mock.log.clone();
		let mut submission = submission_loop(mock, SubmissionPolicy::default());

		let err = submission.run(&mut rx).await.unwrap_err();

		assert!(matches!(err, CoreError::Submission(ref m) if m.contains("bundle malformed")));
		assert_eq!(submission.state(), SubmissionState::Submitting);
		assert!(log.lock().unwrap().waited.is_empty());
	}

	#[tokio::test]
	async fn test_failing_simulation_is_fatal() {
		let (_tx, mut rx) = heads(&[100]);
		let mut mock = MockRelay::new(vec![]);
		mock.simulation.coinbase_diff = U256::ZERO;
		let log = mock.log.clone();
		let mut submission = submission_loop(mock, SubmissionPolicy::default());

		let err = submission.run(&mut rx).await.unwrap_err();

		assert!(matches!(err, CoreError::Simulation(_)));
		assert!(submission.attempts().is_empty());
		assert!(log.lock().unwrap().sent.is_empty());
	}
}
