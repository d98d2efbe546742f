//! Test doubles for the chain access layer

use super::{ChainClient, ChainContext, ClientRegistry, LoanRecord, PoolCapacity};
use crate::config::Config;
use crate::errors::{LendingError, LendingResult};
use crate::types::Blockchain;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory chain state for unit tests
#[derive(Debug, Clone, Default)]
pub struct MockChainClient {
    pub block_height: u64,
    pub fund_sources: HashMap<String, String>,
    pub capacities: HashMap<String, PoolCapacity>,
    pub records: HashMap<(String, u64), LoanRecord>,
    pub outstanding: HashMap<(String, u64), u128>,
    pub message_hash: [u8; 32],
}

impl MockChainClient {
    pub fn with_pool(mut self, address: &str, fund_source: &str, value_locked: u128, utilization: u128) -> Self {
        self.fund_sources
            .insert(address.to_string(), fund_source.to_string());
        self.capacities.insert(
            address.to_string(),
            PoolCapacity {
                value_locked,
                utilization,
            },
        );
        self
    }

    pub fn with_loan(mut self, record: LoanRecord, outstanding: u128) -> Self {
        let key = (record.pool_address.clone(), record.loan_id);
        self.records.insert(key.clone(), record);
        self.outstanding.insert(key, outstanding);
        self
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn block_height(&self) -> LendingResult<u64> {
        Ok(self.block_height)
    }

    async fn loan_record(&self, pool: &str, loan_id: u64) -> LendingResult<LoanRecord> {
        self.records
            .get(&(pool.to_string(), loan_id))
            .cloned()
            .ok_or_else(|| LendingError::upstream("mock", format!("no loan {}#{}", pool, loan_id)))
    }

    async fn outstanding(
        &self,
        record: &LoanRecord,
        _tx_speed_blocks: u64,
    ) -> LendingResult<u128> {
        self.outstanding
            .get(&(record.pool_address.clone(), record.loan_id))
            .copied()
            .ok_or_else(|| LendingError::upstream("mock", "no outstanding entry"))
    }

    async fn fund_source(&self, pool: &str) -> LendingResult<String> {
        self.fund_sources
            .get(pool)
            .cloned()
            .ok_or_else(|| LendingError::upstream("mock", format!("no fund source for {}", pool)))
    }

    async fn pool_capacity(&self, pool: &str) -> LendingResult<PoolCapacity> {
        self.capacities
            .get(pool)
            .copied()
            .ok_or_else(|| LendingError::upstream("mock", format!("no capacity for {}", pool)))
    }

    async fn valuation_message_hash(
        &self,
        _pool: &str,
        _collection_address: &str,
        _nft_id: &str,
        _amount: u128,
        _expires_at_block: u64,
    ) -> LendingResult<[u8; 32]> {
        Ok(self.message_hash)
    }
}

/// Build a `ChainContext` over a mock client for the given network id
pub fn mock_context(network_id: u64, client: MockChainClient) -> ChainContext {
    let config = Config::from_toml_str(&format!(
        r#"
        [[networks]]
        name = "testnet"
        network_id = {network_id}
        rpc_url = "http://localhost:1"
        control_plane = "0xcontrol"
        reserve_pool = "0xreserve"
        "#
    ))
    .unwrap();

    let registry = Arc::new(ClientRegistry::from_config(&config));
    registry.register(network_id, Arc::new(client));

    ChainContext::new(
        Blockchain {
            network: "testnet".to_string(),
            network_id,
        },
        registry,
    )
}
