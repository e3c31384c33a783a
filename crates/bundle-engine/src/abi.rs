//! Token contract bindings and the view calls engines share.

use crate::EngineError;
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};
use bundle_delivery::DeliveryService;

sol! {
	interface IERC20 {
		function balanceOf(address owner) external view returns (uint256);
		function transfer(address to, uint256 amount) external returns (bool);
	}

	interface IERC721 {
		function ownerOf(uint256 tokenId) external view returns (address);
		function setApprovalForAll(address operator, bool approved) external;
		function transferFrom(address from, address to, uint256 tokenId) external;
	}
}

/// Reads the first 32-byte return word of a call.
fn return_word(data: &Bytes, what: &str) -> Result<[u8; 32], EngineError> {
	data.get(..32)
		.and_then(|word| <[u8; 32]>::try_from(word).ok())
		.ok_or_else(|| EngineError::Query(format!("Invalid {} response", what)))
}

/// Queries `balanceOf(holder)`; the selector is shared by ERC-20 and ERC-721.
pub(crate) async fn balance_of(
	delivery: &DeliveryService,
	contract: Address,
	holder: Address,
) -> Result<U256, EngineError> {
	let data = IERC20::balanceOfCall { owner: holder }.abi_encode();
	let result = delivery
		.call(contract, data.into())
		.await
		.map_err(|e| EngineError::Query(format!("balanceOf on {}: {}", contract, e)))?;

	let balance = U256::from_be_bytes(return_word(&result, "balanceOf")?);
	tracing::debug!(contract = %contract, holder = %holder, %balance, "Read balance");
	Ok(balance)
}

/// Queries `ownerOf(token_id)` on an ERC-721 contract.
pub(crate) async fn owner_of(
	delivery: &DeliveryService,
	contract: Address,
	token_id: U256,
) -> Result<Address, EngineError> {
	let data = IERC721::ownerOfCall { tokenId: token_id }.abi_encode();
	let result = delivery
		.call(contract, data.into())
		.await
		.map_err(|e| EngineError::Query(format!("ownerOf({}) on {}: {}", token_id, contract, e)))?;

	let word = return_word(&result, "ownerOf")?;
	Ok(Address::from_slice(&word[12..]))
}

/// Fails with `NoBalance` when `balance` is zero.
pub(crate) fn require_balance(
	balance: U256,
	contract: Address,
	holder: Address,
) -> Result<U256, EngineError> {
	if balance.is_zero() {
		tracing::warn!(contract = %contract, holder = %holder, "Holder has nothing to move");
		return Err(EngineError::NoBalance(format!(
			"{} holds none of {}",
			holder, contract
		)));
	}
	Ok(balance)
}
