//! Pool Aggregator
//!
//! Enumerates, filters, sorts and paginates pools for discovery endpoints.
//! Interest sorting goes through the same `effective_interest_bps` rule the
//! loan option calculator uses, so the two surfaces can never disagree on a
//! pool's effective rate. Capacity and utilization are re-read on every call;
//! nothing is cached.

use crate::chain::ChainContext;
use crate::directory::PoolDirectory;
use crate::errors::LendingResult;
use crate::types::{Pagination, Pool, PoolFilter, PoolSort, PoolView};
use futures::future::try_join_all;
use std::collections::HashMap;
use std::sync::Arc;

/// List pools for discovery. Filters, then sorts, then paginates.
pub async fn list_pools(
    filter: &PoolFilter,
    sort: PoolSort,
    pagination: &Pagination,
    ctx: &ChainContext,
    directory: &dyn PoolDirectory,
) -> LendingResult<Vec<PoolView>> {
    let pools = directory.pools(filter.blockchain.as_ref()).await?;

    let pools: Vec<Pool> = pools
        .into_iter()
        .filter(|p| filter.include_retired || !p.retired)
        .filter(|p| match &filter.collection_address {
            Some(address) => &p.collection_address == address,
            None => true,
        })
        .collect();

    // Collection names for the name filter and name sort
    let mut names: HashMap<String, String> = HashMap::new();
    for pool in &pools {
        if !names.contains_key(&pool.collection_address) {
            let collection = directory.collection(&pool.collection_address).await?;
            names.insert(pool.collection_address.clone(), collection.name);
        }
    }

    let pools: Vec<Pool> = match &filter.name_contains {
        Some(needle) => {
            let needle = needle.to_lowercase();
            pools
                .into_iter()
                .filter(|p| {
                    names
                        .get(&p.collection_address)
                        .map(|n| n.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
                .collect()
        }
        None => pools,
    };

    // Fresh capacity snapshot per pool, read concurrently
    let client = ctx.client()?;
    let reads = pools.iter().map(|pool| {
        let client = Arc::clone(&client);
        let address = pool.address.clone();
        async move { client.pool_capacity(&address).await }
    });
    let capacities = try_join_all(reads).await?;

    let mut views: Vec<PoolView> = pools
        .into_iter()
        .zip(capacities)
        .map(|(pool, capacity)| {
            let collection_name = names
                .get(&pool.collection_address)
                .cloned()
                .unwrap_or_default();
            PoolView {
                pool,
                collection_name,
                value_locked: capacity.value_locked,
                utilization: capacity.utilization,
            }
        })
        .collect();

    sort_views(&mut views, sort);

    Ok(views
        .into_iter()
        .skip(pagination.offset)
        .take(pagination.count)
        .collect())
}

fn sort_views(views: &mut [PoolView], sort: PoolSort) {
    match sort {
        PoolSort::Name => {
            views.sort_by(|a, b| {
                normalize_name(&a.collection_name)
                    .cmp(&normalize_name(&b.collection_name))
                    .then_with(|| a.pool.address.cmp(&b.pool.address))
            });
        }
        PoolSort::Interest => {
            views.sort_by(|a, b| {
                best_effective_interest(&a.pool)
                    .cmp(&best_effective_interest(&b.pool))
                    .then_with(|| a.pool.address.cmp(&b.pool.address))
            });
        }
        PoolSort::MaxLtv => {
            views.sort_by(|a, b| {
                best_max_ltv(&b.pool)
                    .cmp(&best_max_ltv(&a.pool))
                    .then_with(|| a.pool.address.cmp(&b.pool.address))
            });
        }
    }
}

/// Case- and quote-insensitive name key
fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`'))
        .collect::<String>()
        .to_lowercase()
}

/// Lowest effective interest across a pool's tiers, via the shared
/// override-precedence rule
fn best_effective_interest(pool: &Pool) -> u32 {
    pool.loan_options
        .iter()
        .map(|o| o.effective_interest_bps())
        .min()
        .unwrap_or(u32::MAX)
}

/// Highest max LTV across a pool's tiers
fn best_max_ltv(pool: &Pool) -> u32 {
    pool.loan_options.iter().map(|o| o.max_ltv_bps).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::{mock_context, MockChainClient};
    use crate::directory::SnapshotDirectory;
    use crate::loans::options::compute_loan_options;
    use crate::loans::FeePolicy;
    use crate::types::{
        Blockchain, Collection, ExternalId, FeeSchedule, LoanOption, Valuation, Venue,
    };
    use chrono::Utc;

    fn tier(base: u32, overridden: Option<u32>, ltv: u32) -> LoanOption {
        LoanOption {
            duration_blocks: 7200,
            duration_secs: 86_400,
            interest_bps_per_block: base,
            interest_override_bps_per_block: overridden,
            max_ltv_bps: ltv,
            fees: FeeSchedule::default(),
        }
    }

    fn collection(address: &str, name: &str) -> Collection {
        Collection {
            address: address.to_string(),
            blockchain: Blockchain {
                network: "testnet".to_string(),
                network_id: 1,
            },
            external_id: ExternalId {
                venue: Venue::OpenSea,
                id: name.to_lowercase(),
            },
            name: name.to_string(),
            image_url: None,
        }
    }

    fn pool(address: &str, collection: &str, retired: bool, tiers: Vec<LoanOption>) -> Pool {
        Pool {
            address: address.to_string(),
            collection_address: collection.to_string(),
            fund_source: "fs".to_string(),
            version: 2,
            retired,
            loan_options: tiers,
        }
    }

    fn fixture() -> (SnapshotDirectory, MockChainClient) {
        let directory = SnapshotDirectory::new(
            vec![
                collection("0xa", "Azuki"),
                collection("0xb", "\"Beanz\""),
                collection("0xc", "cool cats"),
            ],
            vec![
                pool("0xp1", "0xa", false, vec![tier(4, None, 5000)]),
                pool("0xp2", "0xb", false, vec![tier(6, Some(2), 3000)]),
                pool("0xp3", "0xc", true, vec![tier(3, None, 8000)]),
            ],
        );
        let client = MockChainClient::default()
            .with_pool("0xp1", "fs", 10, 4)
            .with_pool("0xp2", "fs", 20, 5)
            .with_pool("0xp3", "fs", 30, 0);
        (directory, client)
    }

    fn page() -> Pagination {
        Pagination {
            offset: 0,
            count: 100,
        }
    }

    #[tokio::test]
    async fn test_retired_pools_excluded_by_default() {
        let (dir, client) = fixture();
        let ctx = mock_context(1, client);

        let views = list_pools(&PoolFilter::default(), PoolSort::Name, &page(), &ctx, &dir)
            .await
            .unwrap();
        assert_eq!(views.len(), 2);

        let filter = PoolFilter {
            include_retired: true,
            ..Default::default()
        };
        let views = list_pools(&filter, PoolSort::Name, &page(), &ctx, &dir)
            .await
            .unwrap();
        assert_eq!(views.len(), 3);
    }

    #[tokio::test]
    async fn test_name_sort_ignores_case_and_quotes() {
        let (dir, client) = fixture();
        let ctx = mock_context(1, client);

        let filter = PoolFilter {
            include_retired: true,
            ..Default::default()
        };
        let views = list_pools(&filter, PoolSort::Name, &page(), &ctx, &dir)
            .await
            .unwrap();
        // azuki < "beanz" (quotes stripped) < cool cats
        let order: Vec<&str> = views.iter().map(|v| v.pool.address.as_str()).collect();
        assert_eq!(order, vec!["0xp1", "0xp2", "0xp3"]);
    }

    #[tokio::test]
    async fn test_interest_sort_uses_shared_precedence_rule() {
        let (dir, client) = fixture();
        let ctx = mock_context(1, client);

        let views = list_pools(&PoolFilter::default(), PoolSort::Interest, &page(), &ctx, &dir)
            .await
            .unwrap();
        // p2's override of 2 bps beats p1's base of 4 bps
        assert_eq!(views[0].pool.address, "0xp2");

        // The sort key equals what the loan option calculator reports
        let valuation = Valuation {
            value: 1000,
            value_24hr: 1000,
            value_secondary: None,
            resolved_at: Utc::now(),
            venue: Venue::OpenSea,
        };
        for view in &views {
            let computed =
                compute_loan_options(&view.pool, &valuation, "ETH", &FeePolicy::default())
                    .unwrap();
            let min_computed = computed
                .iter()
                .map(|o| o.effective_interest_bps)
                .min()
                .unwrap();
            assert_eq!(min_computed, best_effective_interest(&view.pool));
        }
    }

    #[tokio::test]
    async fn test_name_filter_and_pagination() {
        let (dir, client) = fixture();
        let ctx = mock_context(1, client);

        let filter = PoolFilter {
            name_contains: Some("ZUK".to_string()),
            ..Default::default()
        };
        let views = list_pools(&filter, PoolSort::Name, &page(), &ctx, &dir)
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].collection_name, "Azuki");

        let one = Pagination { offset: 1, count: 1 };
        let views = list_pools(&PoolFilter::default(), PoolSort::Name, &one, &ctx, &dir)
            .await
            .unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].pool.address, "0xp2");
    }

    #[tokio::test]
    async fn test_capacity_snapshot_attached() {
        let (dir, client) = fixture();
        let ctx = mock_context(1, client);

        let views = list_pools(&PoolFilter::default(), PoolSort::MaxLtv, &page(), &ctx, &dir)
            .await
            .unwrap();
        // MaxLtv descending: p1 (5000) then p2 (3000)
        assert_eq!(views[0].pool.address, "0xp1");
        assert_eq!(views[0].value_locked, 10);
        assert_eq!(views[0].utilization, 4);
        assert_eq!(views[0].idle_capacity(), 6);
    }
}
