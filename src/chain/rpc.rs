//! JSON-RPC chain client
//!
//! Speaks JSON-RPC 2.0 to a network's lending node. Amounts cross the wire as
//! decimal strings since JSON numbers cannot carry full base-unit precision.
//! Every call is bounded by the configured deadline; on expiry the in-flight
//! request is dropped and the caller sees a typed `Timeout`.

use super::{with_deadline, ChainClient, LoanRecord, PoolCapacity};
use crate::config::NetworkConfig;
use crate::errors::{LendingError, LendingResult};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

pub struct JsonRpcChainClient {
    endpoint: String,
    control_plane: String,
    http: reqwest::Client,
    timeout: Duration,
    request_id: AtomicU64,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Wire shape of a loan record; amounts as decimal strings
#[derive(Debug, Deserialize)]
struct LoanRecordDto {
    pool: String,
    loan_id: u64,
    borrowed: String,
    returned: String,
    interest_accrued: String,
    interest_repaid: String,
    start_block: u64,
    expiry_block: u64,
}

#[derive(Debug, Deserialize)]
struct PoolCapacityDto {
    value_locked: String,
    utilization: String,
}

fn parse_amount(raw: &str, endpoint: &str) -> LendingResult<u128> {
    raw.parse::<u128>().map_err(|e| {
        LendingError::upstream(endpoint, format!("non-numeric amount '{}': {}", raw, e))
    })
}

impl JsonRpcChainClient {
    pub fn new(network: &NetworkConfig, timeout: Duration) -> LendingResult<Self> {
        let endpoint = Url::parse(&network.rpc_url)
            .map_err(|e| {
                LendingError::Config(format!("Invalid rpc_url '{}': {}", network.rpc_url, e))
            })?
            .to_string();

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LendingError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint,
            control_plane: network.control_plane.clone(),
            http,
            timeout,
            request_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC call and unwrap the result value
    async fn call(&self, method: &str, params: Value) -> LendingResult<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": self.request_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let request = async {
            let response = self
                .http
                .post(&self.endpoint)
                .json(&payload)
                .send()
                .await
                .map_err(|e| LendingError::upstream(&self.endpoint, e))?;

            if !response.status().is_success() {
                return Err(LendingError::upstream(
                    &self.endpoint,
                    format!("HTTP {}", response.status()),
                ));
            }

            let envelope: RpcEnvelope = response
                .json()
                .await
                .map_err(|e| LendingError::upstream(&self.endpoint, e))?;

            if let Some(error) = envelope.error {
                return Err(LendingError::upstream(
                    &self.endpoint,
                    format!("RPC error {}: {}", error.code, error.message),
                ));
            }

            envelope.result.ok_or_else(|| {
                LendingError::upstream(&self.endpoint, "RPC response missing result")
            })
        };

        with_deadline(method, self.timeout, request).await
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, method: &str, value: Value) -> LendingResult<T> {
        serde_json::from_value(value).map_err(|e| {
            logger::warning(
                LogTag::Chain,
                &format!("Malformed {} response from {}: {}", method, self.endpoint, e),
            );
            LendingError::upstream(&self.endpoint, format!("malformed {} response: {}", method, e))
        })
    }
}

#[async_trait]
impl ChainClient for JsonRpcChainClient {
    async fn block_height(&self) -> LendingResult<u64> {
        let result = self.call("lend_blockHeight", json!([])).await?;
        self.decode("lend_blockHeight", result)
    }

    async fn loan_record(&self, pool: &str, loan_id: u64) -> LendingResult<LoanRecord> {
        let result = self.call("lend_getLoan", json!([pool, loan_id])).await?;
        let dto: LoanRecordDto = self.decode("lend_getLoan", result)?;

        Ok(LoanRecord {
            pool_address: dto.pool,
            loan_id: dto.loan_id,
            borrowed: parse_amount(&dto.borrowed, &self.endpoint)?,
            returned: parse_amount(&dto.returned, &self.endpoint)?,
            interest_accrued: parse_amount(&dto.interest_accrued, &self.endpoint)?,
            interest_repaid: parse_amount(&dto.interest_repaid, &self.endpoint)?,
            start_block: dto.start_block,
            expiry_block: dto.expiry_block,
        })
    }

    async fn outstanding(
        &self,
        record: &LoanRecord,
        tx_speed_blocks: u64,
    ) -> LendingResult<u128> {
        let params = json!([
            self.control_plane,
            {
                "pool": record.pool_address,
                "loan_id": record.loan_id,
                "borrowed": record.borrowed.to_string(),
                "returned": record.returned.to_string(),
                "interest_accrued": record.interest_accrued.to_string(),
                "interest_repaid": record.interest_repaid.to_string(),
                "start_block": record.start_block,
                "expiry_block": record.expiry_block,
            },
            tx_speed_blocks,
        ]);

        let result = self.call("lend_outstanding", params).await?;
        let raw: String = self.decode("lend_outstanding", result)?;
        parse_amount(&raw, &self.endpoint)
    }

    async fn fund_source(&self, pool: &str) -> LendingResult<String> {
        let result = self.call("pool_fundSource", json!([pool])).await?;
        self.decode("pool_fundSource", result)
    }

    async fn pool_capacity(&self, pool: &str) -> LendingResult<PoolCapacity> {
        let result = self.call("pool_capacity", json!([pool])).await?;
        let dto: PoolCapacityDto = self.decode("pool_capacity", result)?;

        Ok(PoolCapacity {
            value_locked: parse_amount(&dto.value_locked, &self.endpoint)?,
            utilization: parse_amount(&dto.utilization, &self.endpoint)?,
        })
    }

    async fn valuation_message_hash(
        &self,
        pool: &str,
        collection_address: &str,
        nft_id: &str,
        amount: u128,
        expires_at_block: u64,
    ) -> LendingResult<[u8; 32]> {
        let params = json!([
            pool,
            collection_address,
            nft_id,
            amount.to_string(),
            expires_at_block,
        ]);

        let result = self.call("pool_valuationMessageHash", params).await?;
        let encoded: String = self.decode("pool_valuationMessageHash", result)?;

        let bytes = bs58::decode(&encoded)
            .into_vec()
            .map_err(|e| LendingError::upstream(&self.endpoint, format!("bad hash encoding: {}", e)))?;

        bytes.try_into().map_err(|_| {
            LendingError::upstream(&self.endpoint, "message hash is not 32 bytes")
        })
    }
}
