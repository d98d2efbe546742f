//! Valuation Resolver
//!
//! Resolves a collection's conservative current value plus a 24-hour
//! reference value from one of several venue adapters. The resolved value is
//! always the minimum of floor and trailing 24h average - a deliberate bias
//! against overvaluing collateral.

pub mod units;
pub mod venues;

use crate::config::Config;
use crate::errors::{LendingError, LendingResult};
use crate::logger::{self, LogTag};
use crate::types::{Collection, Valuation, Venue};
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use units::parse_base_units;
use venues::nftbank::NftBankClient;
use venues::opensea::OpenSeaClient;
use venues::synthetic::SyntheticSource;
use venues::FloorAverage;

/// Decimal count used for synthetic stub tables; test networks run the
/// native 18-decimal currency.
const SYNTHETIC_DECIMALS: u32 = 18;

pub struct ValuationResolver {
    opensea: OpenSeaClient,
    nftbank: NftBankClient,
    /// Present only when the synthetic-valuation config gate is set
    synthetic: Option<SyntheticSource>,
    decimals_by_network: HashMap<u64, u32>,
}

impl ValuationResolver {
    pub fn from_config(config: &Config) -> LendingResult<Self> {
        let timeout = Duration::from_millis(config.http.timeout_ms);

        let synthetic = if config.valuation.synthetic {
            logger::warning(
                LogTag::Valuation,
                "Synthetic valuation source is enabled; intended for test networks only",
            );
            Some(SyntheticSource::from_entries(
                &config.valuation.synthetic_values,
                SYNTHETIC_DECIMALS,
            )?)
        } else {
            None
        };

        Ok(Self {
            opensea: OpenSeaClient::new(config.valuation.opensea_api_key.clone(), timeout)?,
            nftbank: NftBankClient::new(config.valuation.nftbank_api_key.clone(), timeout)?,
            synthetic,
            decimals_by_network: config
                .networks
                .iter()
                .map(|n| (n.network_id, n.decimals))
                .collect(),
        })
    }

    /// Resolve a conservative valuation for a collection.
    ///
    /// Fails with `UnsupportedVenue` for unknown external ids,
    /// `MissingCredential` when the venue needs an unconfigured API key and
    /// `UpstreamFailure` on malformed or failed venue responses.
    pub async fn resolve(&self, collection: &Collection) -> LendingResult<Valuation> {
        let external_id = &collection.external_id;

        // Synthetic stubs are gated by the explicit config flag and matched
        // on the exact reserved id, never on substrings of collection names.
        if let Some(synthetic) = &self.synthetic {
            if let Some(stub) = synthetic.valuation_for(&external_id.id) {
                logger::debug(
                    LogTag::Valuation,
                    &format!("Serving synthetic valuation for {}", external_id),
                );
                return Ok(stub);
            }
        }

        let decimals = self
            .decimals_by_network
            .get(&collection.blockchain.network_id)
            .copied()
            .ok_or(LendingError::UnsupportedNetwork(
                collection.blockchain.network_id,
            ))?;

        let prices = match external_id.venue {
            Venue::OpenSea => self.opensea.floor_average(&external_id.id).await?,
            Venue::NftBank => self.resolve_per_token(&external_id.id).await?,
            Venue::Synthetic => {
                // A synthetic id reached a resolver without the gate enabled
                return Err(LendingError::Config(format!(
                    "Synthetic collection '{}' requested but synthetic valuation is disabled",
                    external_id
                )));
            }
        };

        let valuation = build_valuation(&prices, decimals, external_id.venue)?;
        logger::info(
            LogTag::Valuation,
            &format!(
                "Resolved {} via {}: value={} value24hr={}",
                collection.name, external_id.venue, valuation.value, valuation.value_24hr
            ),
        );
        Ok(valuation)
    }

    /// Per-token venue path: resolve the contract's collection grouping and
    /// price that; on grouping failure retry once via the direct
    /// contract-level estimate, then fail.
    async fn resolve_per_token(&self, contract: &str) -> LendingResult<FloorAverage> {
        match self.nftbank.collection_grouping(contract).await {
            Ok(grouping) => self.nftbank.floor_average(&grouping).await,
            Err(err) if err.is_config() => Err(err),
            Err(err) => {
                logger::warning(
                    LogTag::Valuation,
                    &format!(
                        "Token grouping lookup failed for {} ({}), falling back to contract-level estimate",
                        contract, err
                    ),
                );
                self.nftbank.floor_average(contract).await
            }
        }
    }
}

/// Combine venue prices into a valuation: `value` is the minimum of floor and
/// 24h average, `value_24hr` keeps the raw average, and the floor is retained
/// as the secondary reference.
fn build_valuation(
    prices: &FloorAverage,
    decimals: u32,
    venue: Venue,
) -> LendingResult<Valuation> {
    let floor = parse_base_units(&prices.floor, decimals)?;
    let average = parse_base_units(&prices.average_24hr, decimals)?;

    Ok(Valuation {
        value: floor.min(average),
        value_24hr: average,
        value_secondary: Some(floor),
        resolved_at: Utc::now(),
        venue,
    })
}
