//! Terms orchestration
//!
//! [`LendingService`] is the facade the thin HTTP layer calls into. It wires
//! the directory, valuation resolver, option calculator, attestation signer,
//! liquidity router and marketplace adapter into the six functional contracts
//! the core exposes. All state is per-request; the service itself only holds
//! immutable collaborators.

use crate::chain::{ChainContext, ClientRegistry};
use crate::config::Config;
use crate::directory::PoolDirectory;
use crate::errors::{LendingError, LendingResult};
use crate::logger::{self, LogTag};
use crate::loans::options::{compute_loan_options, FeePolicy};
use crate::loans::position;
use crate::marketplace::MarketplaceClient;
use crate::pools;
use crate::routing;
use crate::signer::AttestationSigner;
use crate::types::{
    FlashLoanRoute, LoanPosition, LoanRef, LoanTerms, Pagination, PnplTerms, Pool, PoolFilter,
    PoolSort, PoolView, RolloverTerms, Valuation,
};
use crate::valuation::ValuationResolver;
use std::sync::Arc;
use std::time::Duration;

pub struct LendingService {
    registry: Arc<ClientRegistry>,
    directory: Arc<dyn PoolDirectory>,
    resolver: ValuationResolver,
    /// Absent when no attestation key is configured; signing then fails hard
    /// with `SignerNotConfigured` instead of producing a sentinel signature.
    signer: Option<AttestationSigner>,
    marketplace: Option<MarketplaceClient>,
    fee_policy: FeePolicy,
    tx_speed_blocks: u64,
}

impl LendingService {
    pub fn new(
        config: &Config,
        registry: Arc<ClientRegistry>,
        directory: Arc<dyn PoolDirectory>,
    ) -> LendingResult<Self> {
        let signer = match AttestationSigner::from_config(&config.signer) {
            Ok(signer) => Some(signer),
            Err(LendingError::SignerNotConfigured) => {
                logger::warning(
                    LogTag::Signer,
                    "No attestation key configured; terms requests will fail until one is set",
                );
                None
            }
            Err(err) => return Err(err),
        };

        let marketplace = if config.marketplace.base_url.is_empty() {
            None
        } else {
            Some(MarketplaceClient::new(
                &config.marketplace.base_url,
                config.marketplace.api_key.clone(),
                Duration::from_millis(config.http.timeout_ms),
            )?)
        };

        Ok(Self {
            registry,
            directory,
            resolver: ValuationResolver::from_config(config)?,
            signer,
            marketplace,
            fee_policy: FeePolicy::from_config(config)?,
            tx_speed_blocks: config.loans.tx_speed_blocks,
        })
    }

    /// Resolve a conservative valuation for a collection
    pub async fn resolve_valuation(
        &self,
        collection_ref: &str,
        _ctx: &ChainContext,
    ) -> LendingResult<Valuation> {
        let collection = self.directory.collection(collection_ref).await?;
        self.resolver.resolve(&collection).await
    }

    /// Assemble signed loan terms for one NFT.
    ///
    /// Valuation and pool capacity are read concurrently; signing waits on
    /// the valuation it attests to.
    pub async fn compute_loan_terms(
        &self,
        collection_ref: &str,
        nft_id: &str,
        ctx: &ChainContext,
    ) -> LendingResult<LoanTerms> {
        let collection = self.directory.collection(collection_ref).await?;
        let pool = self.active_pool(&collection.address).await?;
        let client = ctx.client()?;

        let (valuation, capacity) = tokio::try_join!(
            self.resolver.resolve(&collection),
            client.pool_capacity(&pool.address)
        )?;

        if capacity.idle() == 0 {
            logger::warning(
                LogTag::Loans,
                &format!("Pool {} has no idle capacity to lend", pool.address),
            );
            return Err(LendingError::NoLiquidityAvailable);
        }

        let currency = self.registry.currency(ctx.blockchain.network_id)?;
        let options = compute_loan_options(&pool, &valuation, currency, &self.fee_policy)?;

        let signer = self.signer.as_ref().ok_or(LendingError::SignerNotConfigured)?;
        let attestation = signer
            .sign_valuation(&collection.address, nft_id, valuation.value, &pool.address, ctx)
            .await?;

        logger::info(
            LogTag::Loans,
            &format!(
                "Issued terms for {}:{} on pool {} ({} tiers, expires block {})",
                collection.address,
                nft_id,
                pool.address,
                options.len(),
                attestation.expires_at_block
            ),
        );

        Ok(LoanTerms {
            collection,
            pool_address: pool.address,
            nft_id: nft_id.to_string(),
            valuation,
            options,
            attestation,
        })
    }

    /// Refinancing terms: new terms plus the flash loan that repays the
    /// existing position. Fails with `LoanNotActive` when the loan is closed.
    pub async fn compute_rollover_terms(
        &self,
        collection_ref: &str,
        nft_id: &str,
        existing_loan: &LoanRef,
        ctx: &ChainContext,
    ) -> LendingResult<RolloverTerms> {
        let position = position::compute_outstanding(existing_loan, ctx, self.tx_speed_blocks)
            .await?
            .ok_or_else(|| LendingError::LoanNotActive(existing_loan.to_string()))?;

        let terms = self.compute_loan_terms(collection_ref, nft_id, ctx).await?;

        let flash_loan = routing::select_flash_loan_source(
            &terms.pool_address,
            position.outstanding,
            ctx,
            self.directory.as_ref(),
        )
        .await?;

        Ok(RolloverTerms {
            terms,
            outstanding: position.outstanding,
            flash_loan,
        })
    }

    /// PNPL terms: purchase instruction, signed terms and the flash loan
    /// that fronts the purchase price.
    pub async fn compute_pnpl_terms(
        &self,
        collection_ref: &str,
        nft_id: &str,
        ctx: &ChainContext,
    ) -> LendingResult<PnplTerms> {
        let marketplace = self.marketplace.as_ref().ok_or_else(|| {
            LendingError::Config("marketplace.base_url is not configured".to_string())
        })?;

        let (terms, purchase) = tokio::try_join!(
            self.compute_loan_terms(collection_ref, nft_id, ctx),
            marketplace.purchase_instruction(collection_ref, nft_id, &ctx.blockchain)
        )?;

        let flash_loan = routing::select_flash_loan_source(
            &terms.pool_address,
            purchase.price,
            ctx,
            self.directory.as_ref(),
        )
        .await?;

        Ok(PnplTerms {
            terms,
            purchase,
            flash_loan,
        })
    }

    /// Current outstanding debt of a loan, or `None` when it is closed
    pub async fn compute_outstanding(
        &self,
        loan: &LoanRef,
        ctx: &ChainContext,
        tx_speed_blocks: u64,
    ) -> LendingResult<Option<LoanPosition>> {
        position::compute_outstanding(loan, ctx, tx_speed_blocks).await
    }

    /// Select a flash-loan donor for an arbitrary amount
    pub async fn select_flash_loan_source(
        &self,
        target_pool: &str,
        amount: u128,
        ctx: &ChainContext,
    ) -> LendingResult<FlashLoanRoute> {
        routing::select_flash_loan_source(target_pool, amount, ctx, self.directory.as_ref()).await
    }

    /// Pool discovery listing
    pub async fn list_pools(
        &self,
        filter: &PoolFilter,
        sort: PoolSort,
        pagination: &Pagination,
        ctx: &ChainContext,
    ) -> LendingResult<Vec<PoolView>> {
        pools::list_pools(filter, sort, pagination, ctx, self.directory.as_ref()).await
    }

    /// The pool terms are issued against: the highest-version active pool
    /// registered for the collection, ties broken by address for determinism.
    async fn active_pool(&self, collection_address: &str) -> LendingResult<Pool> {
        let mut pools: Vec<Pool> = self
            .directory
            .pools_for_collection(collection_address)
            .await?
            .into_iter()
            .filter(|p| !p.retired)
            .collect();

        pools.sort_by(|a, b| {
            b.version
                .cmp(&a.version)
                .then_with(|| a.address.cmp(&b.address))
        });

        pools.into_iter().next().ok_or_else(|| {
            LendingError::UnknownPool(format!("no active pool for collection {}", collection_address))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::MockChainClient;
    use crate::chain::LoanRecord;
    use crate::directory::SnapshotDirectory;
    use crate::types::{Blockchain, Collection, ExternalId, FeeSchedule, LoanOption, Venue};

    const ETH: u128 = 1_000_000_000_000_000_000;

    fn test_config(with_signer: bool) -> Config {
        let signer_line = if with_signer {
            format!("attestation_key = \"{}\"", bs58::encode([9u8; 32]).into_string())
        } else {
            String::new()
        };
        Config::from_toml_str(&format!(
            r#"
            [[networks]]
            name = "testnet"
            network_id = 1
            rpc_url = "http://localhost:1"
            control_plane = "0xcontrol"
            reserve_pool = "0xreserve"

            [valuation]
            synthetic = true

            [[valuation.synthetic_values]]
            collection_id = "reserved-test-1"
            value = "2"
            value_24hr = "2.5"

            [signer]
            {signer_line}
            horizon_blocks = 40

            [[fees]]
            currency = "ETH"
            fixed = "1000000000000000"
            rate_bps = 50
            "#
        ))
        .unwrap()
    }

    fn tier(ltv: u32) -> LoanOption {
        LoanOption {
            duration_blocks: 7200,
            duration_secs: 86_400,
            interest_bps_per_block: 4,
            interest_override_bps_per_block: None,
            max_ltv_bps: ltv,
            fees: FeeSchedule::default(),
        }
    }

    fn directory() -> SnapshotDirectory {
        let collection = Collection {
            address: "0xcoll".to_string(),
            blockchain: Blockchain {
                network: "testnet".to_string(),
                network_id: 1,
            },
            external_id: ExternalId {
                venue: Venue::Synthetic,
                id: "reserved-test-1".to_string(),
            },
            name: "Reserved Test".to_string(),
            image_url: None,
        };
        // Higher version than the donor so terms are issued against it
        let target = Pool {
            address: "0xpool".to_string(),
            collection_address: "0xcoll".to_string(),
            fund_source: "X".to_string(),
            version: 3,
            retired: false,
            loan_options: vec![tier(5000), tier(3000)],
        };
        let donor = Pool {
            address: "0xdonor".to_string(),
            collection_address: "0xcoll".to_string(),
            fund_source: "Y".to_string(),
            version: 2,
            retired: false,
            loan_options: vec![tier(4000)],
        };
        SnapshotDirectory::new(vec![collection], vec![target, donor])
    }

    fn chain(outstanding: u128) -> MockChainClient {
        let mut client = MockChainClient::default()
            .with_pool("0xpool", "X", 100 * ETH, 10 * ETH)
            .with_pool("0xdonor", "Y", 50 * ETH, 0)
            .with_pool("0xreserve", "Z", 5 * ETH, 0)
            .with_loan(
                LoanRecord {
                    pool_address: "0xpool".to_string(),
                    loan_id: 7,
                    borrowed: 5 * ETH,
                    returned: 2 * ETH,
                    interest_accrued: ETH / 50,
                    interest_repaid: 0,
                    start_block: 10,
                    expiry_block: 7210,
                },
                outstanding,
            );
        client.block_height = 1000;
        client.message_hash = [1u8; 32];
        client
    }

    fn service_and_ctx(with_signer: bool, client: MockChainClient) -> (LendingService, ChainContext) {
        let config = test_config(with_signer);
        let registry = Arc::new(ClientRegistry::from_config(&config));
        registry.register(1, Arc::new(client));
        let ctx = ChainContext::new(
            Blockchain {
                network: "testnet".to_string(),
                network_id: 1,
            },
            Arc::clone(&registry),
        );
        let service = LendingService::new(&config, registry, Arc::new(directory())).unwrap();
        (service, ctx)
    }

    #[tokio::test]
    async fn test_compute_loan_terms_end_to_end() {
        let (service, ctx) = service_and_ctx(true, chain(3 * ETH));

        let terms = service
            .compute_loan_terms("0xcoll", "123", &ctx)
            .await
            .unwrap();

        assert_eq!(terms.pool_address, "0xpool");
        assert_eq!(terms.valuation.value, 2 * ETH);
        assert_eq!(terms.options.len(), 2);
        // 50% LTV of 2 ETH
        assert_eq!(terms.options[0].max_borrow, 1 * ETH);
        // Modern pool carries the configured fee schedule
        assert_eq!(terms.options[0].option.fees.rate_bps, 50);
        assert_eq!(terms.attestation.issued_at_block, 1000);
        assert_eq!(terms.attestation.expires_at_block, 1040);
    }

    #[tokio::test]
    async fn test_missing_signer_fails_hard() {
        let (service, ctx) = service_and_ctx(false, chain(3 * ETH));
        assert!(matches!(
            service.compute_loan_terms("0xcoll", "123", &ctx).await,
            Err(LendingError::SignerNotConfigured)
        ));
    }

    #[tokio::test]
    async fn test_rollover_routes_outstanding_from_donor() {
        let (service, ctx) = service_and_ctx(true, chain(3 * ETH));

        let loan = LoanRef {
            pool_address: "0xpool".to_string(),
            loan_id: 7,
        };
        let rollover = service
            .compute_rollover_terms("0xcoll", "123", &loan, &ctx)
            .await
            .unwrap();

        assert_eq!(rollover.outstanding, 3 * ETH);
        // Donor must not share the target's fund source
        assert_eq!(rollover.flash_loan.pool_address, "0xdonor");
        assert_eq!(rollover.flash_loan.idle_capacity, 50 * ETH);
    }

    #[tokio::test]
    async fn test_rollover_of_closed_loan_fails() {
        let (service, ctx) = service_and_ctx(true, chain(0));

        let loan = LoanRef {
            pool_address: "0xpool".to_string(),
            loan_id: 7,
        };
        assert!(matches!(
            service.compute_rollover_terms("0xcoll", "123", &loan, &ctx).await,
            Err(LendingError::LoanNotActive(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let (service, ctx) = service_and_ctx(true, chain(0));
        assert!(matches!(
            service.compute_loan_terms("0xmissing", "1", &ctx).await,
            Err(LendingError::UnknownCollection(_))
        ));
    }
}
