//! Flashbots-style relay client.
//!
//! Speaks JSON-RPC 2.0 over HTTP. Every request is authenticated with an
//! `X-Flashbots-Signature` header of the form `<address>:<signature>`, where
//! the signature is a personal-message signature over the hex-encoded
//! keccak256 of the request body.

use crate::{RelayError, RelayInterface};
use alloy_primitives::{hex, keccak256, Address, B256, U256};
use async_trait::async_trait;
use bundle_account::AccountService;
use bundle_delivery::DeliveryService;
use bundle_types::{
	BundleResolution, BundleSubmission, ConfigSchema, Field, FieldType, Schema, SignedBundle,
	SimulationResult, TransactionSimulation, ValidationError, truncate_id,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SIGNATURE_HEADER: &str = "X-Flashbots-Signature";

#[derive(Serialize)]
struct JsonRpcRequest<P> {
	jsonrpc: &'static str,
	id: u64,
	method: &'static str,
	params: [P; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallBundleParams {
	txs: Vec<String>,
	block_number: String,
	state_block_number: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendBundleParams {
	txs: Vec<String>,
	block_number: String,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
	result: Option<serde_json::Value>,
	error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
	#[serde(default)]
	code: i64,
	message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallBundleResult {
	bundle_hash: Option<String>,
	#[serde(deserialize_with = "u256_from_number_or_string")]
	coinbase_diff: U256,
	#[serde(default, deserialize_with = "u64_from_number_or_string")]
	total_gas_used: u64,
	#[serde(default)]
	results: Vec<CallBundleTransaction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallBundleTransaction {
	tx_hash: Option<B256>,
	#[serde(default, deserialize_with = "u64_from_number_or_string")]
	gas_used: u64,
	error: Option<String>,
	revert: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendBundleResult {
	bundle_hash: Option<String>,
}

/// Quantities arrive as JSON numbers, decimal strings or hex strings
/// depending on the relay.
#[derive(Deserialize)]
#[serde(untagged)]
enum Quantity {
	Number(u64),
	Text(String),
}

impl Quantity {
	fn into_u256(self) -> Result<U256, String> {
		match self {
			Quantity::Number(n) => Ok(U256::from(n)),
			Quantity::Text(s) => U256::from_str(s.trim()).map_err(|e| format!("'{}': {}", s, e)),
		}
	}
}

fn u256_from_number_or_string<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
	D: Deserializer<'de>,
{
	Quantity::deserialize(deserializer)?
		.into_u256()
		.map_err(serde::de::Error::custom)
}

fn u64_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	let value = Quantity::deserialize(deserializer)?
		.into_u256()
		.map_err(serde::de::Error::custom)?;
	u64::try_from(value).map_err(serde::de::Error::custom)
}

fn block_tag(block: u64) -> String {
	format!("0x{:x}", block)
}

/// Relay client for Flashbots-compatible builders.
pub struct FlashbotsRelay {
	client: reqwest::Client,
	relay_url: String,
	/// Identity used to sign relay requests; holds no funds.
	signer: Arc<AccountService>,
	delivery: Arc<DeliveryService>,
	poll_interval: Duration,
	next_id: AtomicU64,
}

impl FlashbotsRelay {
	pub fn new(
		relay_url: impl Into<String>,
		signer: Arc<AccountService>,
		delivery: Arc<DeliveryService>,
		poll_interval: Duration,
	) -> Self {
		Self {
			client: reqwest::Client::new(),
			relay_url: relay_url.into(),
			signer,
			delivery,
			poll_interval,
			next_id: AtomicU64::new(1),
		}
	}

	/// Builds the value of the request signature header for `body`.
	async fn signature_header(&self, body: &str) -> Result<String, RelayError> {
		let digest = hex::encode_prefixed(keccak256(body.as_bytes()));
		let signature = self
			.signer
			.sign_message(digest.as_bytes())
			.await
			.map_err(|e| RelayError::Signing(e.to_string()))?;

		Ok(format!(
			"{}:{}",
			self.signer.address(),
			hex::encode_prefixed(signature)
		))
	}

	/// Sends a signed JSON-RPC request and returns its `result` member, which
	/// is `Null` when absent.
	async fn request<P: Serialize>(
		&self,
		method: &'static str,
		params: P,
	) -> Result<serde_json::Value, RelayError> {
		let request = JsonRpcRequest {
			jsonrpc: "2.0",
			id: self.next_id.fetch_add(1, Ordering::Relaxed),
			method,
			params: [params],
		};
		let body = serde_json::to_string(&request)
			.map_err(|e| RelayError::InvalidResponse(format!("Cannot encode request: {}", e)))?;
		let signature = self.signature_header(&body).await?;

		tracing::debug!(method, relay = %self.relay_url, "Relay request");

		let response = self
			.client
			.post(&self.relay_url)
			.header(reqwest::header::CONTENT_TYPE, "application/json")
			.header(SIGNATURE_HEADER, signature)
			.body(body)
			.send()
			.await
			.map_err(|e| RelayError::Http(e.to_string()))?;

		let status = response.status();
		let text = response
			.text()
			.await
			.map_err(|e| RelayError::Http(e.to_string()))?;

		// Relays report JSON-RPC errors with non-2xx statuses too
		let parsed: JsonRpcResponse = match serde_json::from_str(&text) {
			Ok(parsed) => parsed,
			Err(_) if !status.is_success() => {
				return Err(RelayError::Http(format!("{}: {}", status, text)));
			},
			Err(e) => return Err(RelayError::InvalidResponse(e.to_string())),
		};

		if let Some(error) = parsed.error {
			return Err(RelayError::Rejected {
				code: error.code,
				message: error.message,
			});
		}

		Ok(parsed.result.unwrap_or(serde_json::Value::Null))
	}

	/// Classifies a submission once its target block has been mined.
	async fn resolve(&self, submission: &BundleSubmission) -> Result<BundleResolution, RelayError> {
		let mut all_included = true;
		for hash in submission.bundle.hashes() {
			let block = self
				.delivery
				.get_receipt_block(hash)
				.await
				.map_err(|e| RelayError::Chain(e.to_string()))?;
			if block != Some(submission.target_block) {
				all_included = false;
				break;
			}
		}
		if all_included {
			return Ok(BundleResolution::BundleIncluded);
		}

		// Highest nonce each signer used in the bundle
		let mut signed_nonces: BTreeMap<Address, u64> = BTreeMap::new();
		for (signer, nonce) in submission.bundle.signer_nonces() {
			let entry = signed_nonces.entry(signer).or_insert(nonce);
			*entry = (*entry).max(nonce);
		}

		for (signer, nonce) in signed_nonces {
			let on_chain = self
				.delivery
				.get_nonce(signer)
				.await
				.map_err(|e| RelayError::Chain(e.to_string()))?;
			if on_chain > nonce {
				tracing::debug!(%signer, on_chain, signed = nonce, "Signer nonce moved past bundle");
				return Ok(BundleResolution::AccountNonceTooHigh);
			}
		}

		Ok(BundleResolution::BlockPassedWithoutInclusion)
	}
}

/// Configuration schema for the Flashbots relay.
pub struct FlashbotsRelaySchema;

impl ConfigSchema for FlashbotsRelaySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("relay_url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
						Ok(())
					},
					_ => Err("relay_url must be an http(s) URL".to_string()),
				}
			})],
			vec![Field::new(
				"resolution_poll_interval_ms",
				FieldType::Integer {
					min: Some(1),
					max: None,
				},
			)],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl RelayInterface for FlashbotsRelay {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FlashbotsRelaySchema)
	}

	async fn simulate(
		&self,
		bundle: &SignedBundle,
		block_number: u64,
	) -> Result<SimulationResult, RelayError> {
		let params = CallBundleParams {
			txs: bundle.raw_transactions(),
			block_number: block_tag(block_number),
			state_block_number: "latest",
		};
		let result = self.request("eth_callBundle", params).await?;
		let result: CallBundleResult = serde_json::from_value(result)
			.map_err(|e| RelayError::InvalidResponse(format!("eth_callBundle: {}", e)))?;

		Ok(SimulationResult {
			bundle_hash: result.bundle_hash,
			coinbase_diff: result.coinbase_diff,
			total_gas_used: result.total_gas_used,
			results: result
				.results
				.into_iter()
				.map(|tx| TransactionSimulation {
					tx_hash: tx.tx_hash,
					gas_used: tx.gas_used,
					error: tx.error,
					revert: tx.revert,
				})
				.collect(),
		})
	}

	async fn send_bundle(
		&self,
		bundle: &SignedBundle,
		target_block: u64,
	) -> Result<BundleSubmission, RelayError> {
		let params = SendBundleParams {
			txs: bundle.raw_transactions(),
			block_number: block_tag(target_block),
		};
		let result = self.request("eth_sendBundle", params).await?;
		// Some relays answer with null or a bare hash
		let bundle_hash = match result {
			serde_json::Value::String(hash) => Some(hash),
			serde_json::Value::Null => None,
			other => serde_json::from_value::<SendBundleResult>(other)
				.map_err(|e| RelayError::InvalidResponse(format!("eth_sendBundle: {}", e)))?
				.bundle_hash,
		};

		tracing::debug!(
			target_block,
			bundle_hash = %bundle_hash.as_deref().map(truncate_id).unwrap_or_default(),
			"Bundle accepted by relay"
		);

		Ok(BundleSubmission {
			bundle_hash,
			target_block,
			bundle: bundle.clone(),
		})
	}

	async fn wait(&self, submission: &BundleSubmission) -> Result<BundleResolution, RelayError> {
		loop {
			let head = self
				.delivery
				.get_block_number()
				.await
				.map_err(|e| RelayError::Chain(e.to_string()))?;
			if head >= submission.target_block {
				break;
			}
			tokio::time::sleep(self.poll_interval).await;
		}

		self.resolve(submission).await
	}
}

/// Factory function to create a Flashbots relay client from configuration.
///
/// # Parameters
/// - `config`: TOML table containing `relay_url` (required) and
///   `resolution_poll_interval_ms` (optional, default 1000)
/// - `signer`: account whose signature identifies this sender to the relay
/// - `delivery`: chain access used to resolve submissions
pub fn create_relay(
	config: &toml::Value,
	signer: Arc<AccountService>,
	delivery: Arc<DeliveryService>,
) -> Result<Box<dyn RelayInterface>, RelayError> {
	FlashbotsRelaySchema
		.validate(config)
		.map_err(|e| RelayError::InvalidConfig(e.to_string()))?;

	let relay_url = config
		.get("relay_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| RelayError::InvalidConfig("relay_url is required".to_string()))?;

	let poll_interval_ms = config
		.get("resolution_poll_interval_ms")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(1_000);

	Ok(Box::new(FlashbotsRelay::new(
		relay_url,
		signer,
		delivery,
		Duration::from_millis(poll_interval_ms),
	)))
}

/// Registry for the Flashbots relay implementation.
pub struct Registry;

impl bundle_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "flashbots";
	type Factory = crate::RelayFactory;

	fn factory() -> Self::Factory {
		create_relay
	}
}

impl crate::RelayRegistry for Registry {}
