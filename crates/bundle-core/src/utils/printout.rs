//! Human-readable bundle listing.

use bundle_types::{format_gwei, BundleEntry, SignedBundle, U256};

/// Logs one line per signed bundle entry, in execution order.
///
/// Entries and signed transactions are paired by position.
pub fn log_bundle(entries: &[BundleEntry], bundle: &SignedBundle) {
	for (i, (entry, tx)) in entries.iter().zip(&bundle.transactions).enumerate() {
		tracing::info!(
			index = i,
			role = %entry.role,
			signer = %tx.signer,
			nonce = tx.nonce,
			to = %tx.to,
			value = %tx.value,
			gas_limit = tx.gas_limit,
			gas_price = %format_gwei(U256::from(tx.gas_price)),
			tx_hash = %tx.hash,
			"TX #{}: {} => {}",
			i,
			tx.signer,
			tx.to
		);
	}
}
