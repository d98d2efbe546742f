//! Pool/Collection directory seam
//!
//! The directory is an external collaborator that owns collection and pool
//! master data; the core only reads snapshots of it. The surrounding service
//! layer provides the production implementation backed by its registry
//! database. [`SnapshotDirectory`] is an in-memory implementation over a
//! fixed snapshot, used by tests and offline tooling.

use crate::errors::{LendingError, LendingResult};
use crate::types::{Blockchain, Collection, Pool};
use async_trait::async_trait;

#[async_trait]
pub trait PoolDirectory: Send + Sync {
    /// Look up a collection by its on-chain address
    async fn collection(&self, collection_ref: &str) -> LendingResult<Collection>;

    /// All pools registered against a collection
    async fn pools_for_collection(&self, collection_address: &str) -> LendingResult<Vec<Pool>>;

    /// Look up a single pool by address
    async fn pool(&self, address: &str) -> LendingResult<Pool>;

    /// All pools, optionally restricted to one blockchain
    async fn pools(&self, blockchain: Option<&Blockchain>) -> LendingResult<Vec<Pool>>;
}

/// In-memory directory over a fixed snapshot of collections and pools
#[derive(Debug, Clone, Default)]
pub struct SnapshotDirectory {
    collections: Vec<Collection>,
    pools: Vec<Pool>,
}

impl SnapshotDirectory {
    pub fn new(collections: Vec<Collection>, pools: Vec<Pool>) -> Self {
        Self { collections, pools }
    }

    fn collection_blockchain(&self, collection_address: &str) -> Option<&Blockchain> {
        self.collections
            .iter()
            .find(|c| c.address == collection_address)
            .map(|c| &c.blockchain)
    }
}

#[async_trait]
impl PoolDirectory for SnapshotDirectory {
    async fn collection(&self, collection_ref: &str) -> LendingResult<Collection> {
        self.collections
            .iter()
            .find(|c| c.address == collection_ref)
            .cloned()
            .ok_or_else(|| LendingError::UnknownCollection(collection_ref.to_string()))
    }

    async fn pools_for_collection(&self, collection_address: &str) -> LendingResult<Vec<Pool>> {
        Ok(self
            .pools
            .iter()
            .filter(|p| p.collection_address == collection_address)
            .cloned()
            .collect())
    }

    async fn pool(&self, address: &str) -> LendingResult<Pool> {
        self.pools
            .iter()
            .find(|p| p.address == address)
            .cloned()
            .ok_or_else(|| LendingError::UnknownPool(address.to_string()))
    }

    async fn pools(&self, blockchain: Option<&Blockchain>) -> LendingResult<Vec<Pool>> {
        let pools = self
            .pools
            .iter()
            .filter(|p| match blockchain {
                Some(chain) => self
                    .collection_blockchain(&p.collection_address)
                    .map(|c| c == chain)
                    .unwrap_or(false),
                None => true,
            })
            .cloned()
            .collect();
        Ok(pools)
    }
}
