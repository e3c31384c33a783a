//! Common types module for the sponsored bundle system.
//!
//! This module defines the data model shared by every crate in the workspace:
//! the transaction shapes that flow from transfer engines through gas budgeting
//! and bundle assembly to the relay, plus configuration validation helpers.

/// Bundle types: ordered entries, signed bundles, simulation and resolution.
pub mod bundle;
/// Implementation registry trait used by every pluggable component.
pub mod registry;
/// Secret string wrapper for private keys.
pub mod secret_string;
/// Transaction types at each stage of the pipeline.
pub mod transaction;
/// Utility functions for formatting and address parsing.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use alloy_primitives::{Address, Bytes, B256, U256};
pub use bundle::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use transaction::*;
pub use utils::{format_gwei, parse_address, truncate_id, GWEI, PLAIN_TRANSFER_GAS};
pub use validation::*;
