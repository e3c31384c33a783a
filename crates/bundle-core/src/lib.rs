//! Core orchestration for the sponsored bundle service.
//!
//! Turns the transfers a [`bundle_engine::TransferEngine`] describes into a
//! signed, ordered bundle whose first entry funds every later one, and drives
//! that bundle through the relay block by block until it lands or the run
//! hits a terminal failure.
//!
//! The pipeline is split the same way the data flows:
//! - [`gas`] estimates every transaction and sizes the sponsor payment
//! - [`bundle`] assembles and signs the ordered bundle
//! - [`simulation`] checks a relay dry-run and derives the effective gas price
//! - [`submission`] runs the per-head submission state machine
//! - [`engine`] ties these together, and [`builder`] wires it from configuration

use thiserror::Error;

pub mod builder;
pub mod bundle;
pub mod engine;
pub mod gas;
pub mod simulation;
pub mod submission;
mod utils;

pub use builder::{BuilderError, SponsorBuilder, SponsorFactories};
pub use bundle::{sign_bundle, BundleAssembler, BundleNonces};
pub use engine::{PreparedBundle, SponsorEngine};
pub use gas::{GasBudget, GasBudgetCalculator};
pub use simulation::check_simulation;
pub use submission::{SubmissionLoop, SubmissionOutcome, SubmissionPolicy, SubmissionState};

/// Errors that can end a sponsored bundle run.
#[derive(Debug, Error)]
pub enum CoreError {
	/// A transaction could not be estimated, so the bundle would fail on chain.
	#[error("Gas estimation failed: {0}")]
	Estimation(String),
	/// The relay dry-run rejected the signed bundle.
	#[error("Simulation failed: {0}")]
	Simulation(String),
	/// Sending the bundle or resolving its target block failed.
	#[error("Submission failed: {0}")]
	Submission(String),
	/// A bundle entry could not be signed.
	#[error("Signing failed: {0}")]
	Signing(String),
	/// The transfer engine could not produce its transactions.
	#[error("Engine error: {0}")]
	Engine(String),
	/// The chain head stream ended before the bundle was resolved.
	#[error("Head stream closed")]
	HeadStreamClosed,
	/// Chain state needed to build the bundle could not be read.
	#[error("Configuration error: {0}")]
	Config(String),
}
