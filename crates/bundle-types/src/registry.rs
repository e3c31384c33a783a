//! Registry trait for self-registering implementations.
//!
//! Every pluggable component (accounts, chain providers, relays, transfer
//! engines) ships a `Registry` struct implementing this trait, so the service
//! can map configuration names onto factory functions.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// For example `"multi_transfer_erc20"` for `[engine] kind = "multi_transfer_erc20"`,
	/// or `"flashbots"` for the relay client.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
