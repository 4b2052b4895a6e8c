//!
//! REST client for the Carbon chain node.
//!
//! This module provides an async client over the node's public REST API: the Carbon
//! endpoints (`/get_blocks`, `/get_balance`, ...) and the legacy Cosmos LCD routes for
//! staking and distribution. Failures are classified into the `ChainError` variants the
//! reconciler recovers from.

use super::source::ChainSource;
use super::types::*;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Carbon REST node client
#[derive(Clone)]
pub struct CarbonRestClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// The base URL of the REST node, without trailing slash.
	base_url: String,
}

impl CarbonRestClient {
	/// Create a new REST client.
	///
	/// # Arguments
	/// * `base_url` - The REST node endpoint, e.g. `https://tradescan.switcheo.org`.
	/// * `timeout` - Per-request timeout; expiry surfaces as `ChainError::RequestTimedOut`.
	pub fn new(base_url: String, timeout: Duration) -> Self {
		let http_client = Client::builder()
			.timeout(timeout)
			.build()
			.expect("Failed to create HTTP client");

		Self {
			http_client,
			base_url: base_url.trim_end_matches('/').to_string(),
		}
	}

	/// Issue a GET request and decode the JSON body.
	///
	/// # Errors
	/// Returns a classified `ChainError` for transport failures, non-success statuses
	/// and undecodable bodies.
	async fn get_json<T: DeserializeOwned>(
		&self,
		path: &str,
		query: &[(&str, &str)],
	) -> Result<T, ChainError> {
		let url = format!("{}{}", self.base_url, path);
		debug!("GET {} {:?}", url, query);

		let response = self
			.http_client
			.get(&url)
			.query(query)
			.send()
			.await
			.map_err(classify_transport_error)?;

		let status = response.status();
		let body = response.text().await.map_err(classify_transport_error)?;

		if !status.is_success() {
			return Err(classify_failure(status, &body));
		}

		serde_json::from_str(&body).map_err(|e| {
			// Some node errors come back as 200 with a plain-text or `{"error": ..}` body
			match classify_failure(status, &body) {
				ChainError::ApiError { .. } => ChainError::JsonError(e),
				classified => classified,
			}
		})
	}

	async fn get_lcd<T: DeserializeOwned + Default>(&self, path: &str) -> Result<T, ChainError> {
		let response: LcdResponse<T> = self.get_json(path, &[]).await?;
		Ok(response.into_result())
	}
}

fn classify_transport_error(error: reqwest::Error) -> ChainError {
	if error.is_timeout() {
		ChainError::RequestTimedOut
	} else {
		ChainError::HttpError(error)
	}
}

/// Map a failed response onto the error taxonomy the reconciler understands.
///
/// Client errors (other than 408) are never treated as transient, whatever their body says;
/// body text is only trusted for timeouts and sync state on server errors and on 200
/// responses that failed to decode.
fn classify_failure(status: StatusCode, body: &str) -> ChainError {
	if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
		return ChainError::RequestTimedOut;
	}
	if status == StatusCode::SERVICE_UNAVAILABLE {
		return ChainError::NodeCatchingUp;
	}

	let message = body.to_ascii_lowercase();
	if let Some(missing) = classify_missing(&message, body) {
		return missing;
	}
	if !status.is_client_error() {
		if message.contains("timed out") || message.contains("timeout") {
			return ChainError::RequestTimedOut;
		}
		if message.contains("catching up") {
			return ChainError::NodeCatchingUp;
		}
	}

	ChainError::ApiError {
		status: status.as_u16(),
		message: body.to_string(),
	}
}

fn classify_missing(message: &str, body: &str) -> Option<ChainError> {
	if message.contains("no delegation") || message.contains("delegation does not exist") {
		Some(ChainError::DelegationNotFound(body.to_string()))
	} else if message.contains("validator does not exist") || message.contains("no validator") {
		Some(ChainError::ValidatorNotFound(body.to_string()))
	} else {
		None
	}
}

#[async_trait::async_trait]
impl ChainSource for CarbonRestClient {
	async fn latest_blocks(&self, limit: u32) -> Result<Vec<BlockInfo>, ChainError> {
		let limit = limit.to_string();
		self.get_json("/get_blocks", &[("limit", limit.as_str())])
			.await
	}

	async fn all_validators(&self) -> Result<Vec<ValidatorInfo>, ChainError> {
		self.get_json("/get_all_validators", &[]).await
	}

	async fn validator_delegations(
		&self,
		operator_address: &str,
	) -> Result<Vec<ValidatorDelegation>, ChainError> {
		self.get_lcd(&format!("/staking/validators/{}/delegations", operator_address))
			.await
	}

	async fn delegator_delegations(&self, address: &str) -> Result<Vec<Delegation>, ChainError> {
		self.get_lcd(&format!("/staking/delegators/{}/delegations", address))
			.await
	}

	async fn delegator_unbonding_delegations(
		&self,
		address: &str,
	) -> Result<Vec<UnbondingDelegation>, ChainError> {
		self.get_lcd(&format!(
			"/staking/delegators/{}/unbonding_delegations",
			address
		))
		.await
	}

	async fn delegator_distribution(
		&self,
		address: &str,
	) -> Result<DelegatorRewards, ChainError> {
		self.get_lcd(&format!("/distribution/delegators/{}/rewards", address))
			.await
	}

	async fn validator_distribution(
		&self,
		operator_address: &str,
	) -> Result<ValidatorDistribution, ChainError> {
		self.get_lcd(&format!("/distribution/validators/{}", operator_address))
			.await
	}

	async fn spot_balance(&self, address: &str) -> Result<Vec<SpotBalance>, ChainError> {
		// Keyed by denom; a BTreeMap keeps the merge order deterministic
		let balances: Option<BTreeMap<String, SpotBalance>> = self
			.get_json("/get_balance", &[("account", address)])
			.await?;
		Ok(balances.unwrap_or_default().into_values().collect())
	}

	async fn profile(&self, address: &str) -> Result<Profile, ChainError> {
		self.get_json("/get_profile", &[("account", address)])
			.await
	}

	async fn all_tokens(&self) -> Result<Vec<TokenInfo>, ChainError> {
		let tokens: Vec<TokenInfo> = self.get_json("/get_tokens", &[]).await?;
		if tokens.is_empty() {
			return Err(ChainError::NoData("token list is empty".to_string()));
		}
		Ok(tokens)
	}
}
