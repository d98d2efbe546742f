//! Liquidity Router
//!
//! Selects which pool fronts a flash loan for PNPL and rollover flows. The
//! fund-source filter is a solvency-accounting requirement: a pool must never
//! be financed, even indirectly, by its own upstream capital, or the books
//! can describe a circular funding path. Capacity math is on snapshots read
//! within this request; nothing here is cached.

use crate::chain::ChainContext;
use crate::directory::PoolDirectory;
use crate::errors::{LendingError, LendingResult};
use crate::logger::{self, LogTag};
use crate::types::FlashLoanRoute;
use futures::future::try_join_all;
use std::sync::Arc;

/// Pools below this version cannot act as flash-loan donors
const FLASH_LOAN_MIN_VERSION: u32 = 2;

/// Select a donor pool with at least `amount` of idle capacity and a fund
/// source distinct from the target's.
///
/// Among eligible application pools the one with the greatest idle capacity
/// wins; ties break by pool address ascending so the decision is
/// deterministic. When no application pool is eligible, the per-network
/// reserve pool is the single fallback; if it also shares the target's fund
/// source or lacks capacity, the request fails with `NoLiquidityAvailable`.
pub async fn select_flash_loan_source(
    target_pool: &str,
    amount: u128,
    ctx: &ChainContext,
    directory: &dyn PoolDirectory,
) -> LendingResult<FlashLoanRoute> {
    let client = ctx.client()?;
    let target_fund_source = client.fund_source(target_pool).await?;

    let pools = directory.pools(Some(&ctx.blockchain)).await?;
    let candidates: Vec<String> = pools
        .into_iter()
        .filter(|p| {
            p.version >= FLASH_LOAN_MIN_VERSION && !p.retired && p.address != target_pool
        })
        .map(|p| p.address)
        .collect();

    // Fund source and capacity are read concurrently across all candidates;
    // any read failure fails the whole request rather than routing on
    // partial data.
    let reads = candidates.into_iter().map(|address| {
        let client = Arc::clone(&client);
        async move {
            let (fund_source, capacity) = tokio::try_join!(
                client.fund_source(&address),
                client.pool_capacity(&address)
            )?;
            Ok::<_, LendingError>((address, fund_source, capacity))
        }
    });
    let snapshots = try_join_all(reads).await?;

    let mut best: Option<FlashLoanRoute> = None;
    for (address, fund_source, capacity) in snapshots {
        let idle = capacity.idle();
        if idle < amount {
            logger::debug(
                LogTag::Router,
                &format!("Candidate {} discarded: idle {} < requested {}", address, idle, amount),
            );
            continue;
        }
        if fund_source == target_fund_source {
            logger::debug(
                LogTag::Router,
                &format!("Candidate {} discarded: shares fund source with target", address),
            );
            continue;
        }

        let better = match &best {
            None => true,
            Some(current) => {
                idle > current.idle_capacity
                    || (idle == current.idle_capacity && address < current.pool_address)
            }
        };
        if better {
            best = Some(FlashLoanRoute {
                pool_address: address,
                idle_capacity: idle,
            });
        }
    }

    if let Some(route) = best {
        logger::info(
            LogTag::Router,
            &format!(
                "Routing {} from donor {} (idle {})",
                amount, route.pool_address, route.idle_capacity
            ),
        );
        return Ok(route);
    }

    reserve_fallback(target_pool, &target_fund_source, amount, ctx).await
}

async fn reserve_fallback(
    target_pool: &str,
    target_fund_source: &str,
    amount: u128,
    ctx: &ChainContext,
) -> LendingResult<FlashLoanRoute> {
    let reserve = match ctx.registry.reserve_pool(ctx.blockchain.network_id)? {
        Some(address) if address != target_pool => address.to_string(),
        _ => return Err(LendingError::NoLiquidityAvailable),
    };

    let client = ctx.client()?;
    let (fund_source, capacity) = tokio::try_join!(
        client.fund_source(&reserve),
        client.pool_capacity(&reserve)
    )?;

    if fund_source == target_fund_source {
        logger::warning(
            LogTag::Router,
            &format!("Reserve pool {} shares the target's fund source", reserve),
        );
        return Err(LendingError::NoLiquidityAvailable);
    }

    let idle = capacity.idle();
    if idle < amount {
        logger::warning(
            LogTag::Router,
            &format!("Reserve pool {} idle {} below requested {}", reserve, idle, amount),
        );
        return Err(LendingError::NoLiquidityAvailable);
    }

    logger::info(
        LogTag::Router,
        &format!("Routing {} from reserve pool {} (idle {})", amount, reserve, idle),
    );
    Ok(FlashLoanRoute {
        pool_address: reserve,
        idle_capacity: idle,
    })
}
