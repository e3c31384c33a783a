//! Constants shared across the bundle pipeline.

/// Number of wei in one gwei.
pub const GWEI: u128 = 1_000_000_000;

/// Gas limit of a plain value transfer with no calldata.
///
/// Used for the sponsor funding transaction at the head of every bundle.
pub const PLAIN_TRANSFER_GAS: u64 = 21_000;
