//! Account management for the sponsored bundle service.
//!
//! Three accounts take part in every run: the executor that owns the assets,
//! the sponsor that pays for gas, and the relay identity that authenticates
//! submissions. Each is an [`AccountInterface`] implementation wrapped in an
//! [`AccountService`].

use async_trait::async_trait;
use bundle_types::{
	Address, ConfigSchema, ImplementationRegistry, SignedTransaction, UnsignedTransaction,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error that occurs when interacting with the account implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Trait defining the interface for account implementations.
///
/// Implementations hold a signing key and expose its address, legacy
/// transaction signing, and EIP-191 personal message signing.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Returns the configuration schema for this account implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Retrieves the address associated with this account.
	async fn address(&self) -> Result<Address, AccountError>;

	/// Signs a fully specified transaction.
	///
	/// The result carries the EIP-2718 encoding and the transaction hash.
	async fn sign_transaction(
		&self,
		tx: &UnsignedTransaction,
	) -> Result<SignedTransaction, AccountError>;

	/// Signs an arbitrary message with the EIP-191 personal message prefix.
	///
	/// Returns the 65-byte `r || s || v` signature.
	async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, AccountError>;
}

/// Type alias for account factory functions.
pub type AccountFactory = fn(&toml::Value) -> Result<Box<dyn AccountInterface>, AccountError>;

/// Registry trait for account implementations.
pub trait AccountRegistry: ImplementationRegistry<Factory = AccountFactory> {}

/// Get all registered account implementations.
///
/// Returns a vector of (name, factory) tuples for all available account implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AccountFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service that manages account operations.
///
/// The address is resolved once at construction so it can be read
/// synchronously for logging and bundle assembly.
pub struct AccountService {
	/// The underlying account implementation.
	implementation: Box<dyn AccountInterface>,
	address: Address,
}

impl AccountService {
	/// Creates a new AccountService with the specified implementation.
	pub async fn new(implementation: Box<dyn AccountInterface>) -> Result<Self, AccountError> {
		let address = implementation.address().await?;
		Ok(Self {
			implementation,
			address,
		})
	}

	/// Returns the address of the managed account.
	pub fn address(&self) -> Address {
		self.address
	}

	/// Signs a transaction using the managed account.
	pub async fn sign(&self, tx: &UnsignedTransaction) -> Result<SignedTransaction, AccountError> {
		self.implementation.sign_transaction(tx).await
	}

	/// Signs a personal message using the managed account.
	pub async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, AccountError> {
		self.implementation.sign_message(message).await
	}
}
