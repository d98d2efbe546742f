//! Chain access layer
//!
//! [`ChainClient`] is the seam between the lending core and blockchain RPC.
//! The production implementation is [`rpc::JsonRpcChainClient`]; tests supply
//! their own mock implementations. Clients are shared read-only, one per
//! network id, via the explicit [`registry::ClientRegistry`] that flows
//! through every request inside a [`ChainContext`].

pub mod registry;
pub mod rpc;
#[cfg(test)]
pub mod testing;

use crate::errors::{LendingError, LendingResult};
use crate::types::Blockchain;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use registry::ClientRegistry;

/// Value locked and current utilization of a pool, read in one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCapacity {
    pub value_locked: u128,
    pub utilization: u128,
}

impl PoolCapacity {
    /// Amount available to lend or route: value locked minus utilization
    pub fn idle(&self) -> u128 {
        self.value_locked.saturating_sub(self.utilization)
    }
}

/// Raw on-chain loan record, passed back verbatim to the accrual function
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRecord {
    pub pool_address: String,
    pub loan_id: u64,
    pub borrowed: u128,
    pub returned: u128,
    pub interest_accrued: u128,
    pub interest_repaid: u128,
    pub start_block: u64,
    pub expiry_block: u64,
}

/// Read-only blockchain operations the core depends on.
///
/// All financial figures are delegated to on-chain functions so the numbers
/// this core reports can never drift from what the contracts charge.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current block height
    async fn block_height(&self) -> LendingResult<u64>;

    /// Fetch the raw loan record held by a pool
    async fn loan_record(&self, pool: &str, loan_id: u64) -> LendingResult<LoanRecord>;

    /// Invoke the control-plane contract's authoritative accrual function.
    /// `tx_speed_blocks` predicts interest accrued by the time a submitted
    /// transaction lands.
    async fn outstanding(&self, record: &LoanRecord, tx_speed_blocks: u64)
        -> LendingResult<u128>;

    /// Read a pool's opaque fund-source identifier
    async fn fund_source(&self, pool: &str) -> LendingResult<String>;

    /// Read a pool's value locked and utilization in one call
    async fn pool_capacity(&self, pool: &str) -> LendingResult<PoolCapacity>;

    /// Ask the target pool contract for its canonical valuation message hash.
    /// Keeping the hash scheme on-chain means client and contract can never
    /// disagree on encoding.
    async fn valuation_message_hash(
        &self,
        pool: &str,
        collection_address: &str,
        nft_id: &str,
        amount: u128,
        expires_at_block: u64,
    ) -> LendingResult<[u8; 32]>;
}

/// Per-request chain context: which blockchain, and the shared client registry
#[derive(Clone)]
pub struct ChainContext {
    pub blockchain: Blockchain,
    pub registry: Arc<ClientRegistry>,
}

impl ChainContext {
    pub fn new(blockchain: Blockchain, registry: Arc<ClientRegistry>) -> Self {
        Self {
            blockchain,
            registry,
        }
    }

    /// The shared chain client for this request's network
    pub fn client(&self) -> LendingResult<Arc<dyn ChainClient>> {
        self.registry.client(self.blockchain.network_id)
    }
}

/// Bound a future to a hard deadline.
///
/// On expiry the inner future is dropped, which cancels any in-flight
/// request, and the caller gets a typed `Timeout` instead of partial data.
pub async fn with_deadline<T, F>(
    operation: &str,
    timeout: Duration,
    fut: F,
) -> LendingResult<T>
where
    F: Future<Output = LendingResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(LendingError::Timeout {
            operation: operation.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_capacity() {
        let capacity = PoolCapacity {
            value_locked: 10,
            utilization: 4,
        };
        assert_eq!(capacity.idle(), 6);

        let overdrawn = PoolCapacity {
            value_locked: 4,
            utilization: 10,
        };
        assert_eq!(overdrawn.idle(), 0);
    }

    #[tokio::test]
    async fn test_with_deadline_expires() {
        let result: LendingResult<()> = with_deadline(
            "slow-op",
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(LendingError::Timeout { timeout_ms: 10, .. })
        ));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_through() {
        let result = with_deadline("fast-op", Duration::from_secs(1), async { Ok(7u64) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
