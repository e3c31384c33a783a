//! Checks on a relay dry-run of the signed bundle.

use crate::CoreError;
use bundle_types::{SimulationResult, U256};

/// Validates a simulation and returns the effective gas price it pays.
///
/// Fails on the first transaction that errored, naming its index and revert
/// reason, and on a bundle that leaves the block builder nothing. The
/// effective price is the builder's balance gain divided by the total gas
/// used, rounded down.
pub fn check_simulation(simulation: &SimulationResult) -> Result<U256, CoreError> {
	for (i, tx) in simulation.results.iter().enumerate() {
		if let Some(error) = &tx.error {
			return Err(CoreError::Simulation(format!(
				"TX #{}: {} {}",
				i,
				error,
				tx.revert.as_deref().unwrap_or_default()
			)
			.trim_end()
			.to_string()));
		}
	}

	if simulation.coinbase_diff.is_zero() {
		return Err(CoreError::Simulation("Does not pay coinbase".into()));
	}
	if simulation.total_gas_used == 0 {
		return Err(CoreError::Simulation("Bundle used no gas".into()));
	}

	Ok(simulation.coinbase_diff / U256::from(simulation.total_gas_used))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_utils::paying_simulation;
	use bundle_types::{TransactionSimulation, GWEI};

	#[test]
	fn test_effective_gas_price() {
		assert_eq!(
			check_simulation(&paying_simulation()).unwrap(),
			U256::from(30 * GWEI)
		);

		let mut uneven = paying_simulation();
		uneven.coinbase_diff = U256::from(100u64);
		uneven.total_gas_used = 3;
		assert_eq!(check_simulation(&uneven).unwrap(), U256::from(33u64));
	}

	#[test]
	fn test_reverted_transaction_is_named() {
		let mut simulation = paying_simulation();
		simulation.results[1] = TransactionSimulation {
			error: Some("execution reverted".into()),
			revert: Some("ERC20: transfer amount exceeds balance".into()),
			..Default::default()
		};

		let err = check_simulation(&simulation).unwrap_err().to_string();
		assert!(err.contains("TX #1: execution reverted ERC20: transfer amount exceeds balance"));
	}

	#[test]
	fn test_error_without_revert_reason() {
		let mut simulation = paying_simulation();
		simulation.results[0].error = Some("out of gas".into());
		let err = check_simulation(&simulation).unwrap_err();
		assert!(matches!(err, CoreError::Simulation(ref m) if m == "TX #0: out of gas"));
	}

	#[test]
	fn test_zero_coinbase_rejected() {
		let mut simulation = paying_simulation();
		simulation.coinbase_diff = U256::ZERO;
		let err = check_simulation(&simulation).unwrap_err();
		assert!(err.to_string().contains("Does not pay coinbase"));
	}
}
