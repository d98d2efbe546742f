//! Canonical domain model for the lending core.
//!
//! Every module works against these definitions; there are deliberately no
//! parallel re-definitions of blockchain, value or pool shapes anywhere else
//! in the crate.

use crate::errors::{LendingError, LendingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A blockchain identified by human-readable network name and numeric id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blockchain {
    pub network: String,
    pub network_id: u64,
}

/// Valuation venues the resolver knows how to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Venue {
    /// Floor / trailing-average price venue
    OpenSea,
    /// Per-token valuation venue with collection grouping
    NftBank,
    /// Fixed stub values for non-production networks, config-gated
    Synthetic,
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Venue::OpenSea => write!(f, "opensea"),
            Venue::NftBank => write!(f, "nftbank"),
            Venue::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Venue-qualified external identifier of a collection, e.g. `opensea:azuki`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalId {
    pub venue: Venue,
    pub id: String,
}

impl ExternalId {
    /// Parse a `venue:id` string. Unknown venue prefixes fail with
    /// `UnsupportedVenue` so callers can surface them as bad input.
    pub fn parse(raw: &str) -> LendingResult<Self> {
        let (venue_str, id) = raw
            .split_once(':')
            .ok_or_else(|| LendingError::UnsupportedVenue(raw.to_string()))?;

        let venue = match venue_str {
            "opensea" => Venue::OpenSea,
            "nftbank" => Venue::NftBank,
            "synthetic" => Venue::Synthetic,
            _ => return Err(LendingError::UnsupportedVenue(raw.to_string())),
        };

        if id.is_empty() {
            return Err(LendingError::UnsupportedVenue(raw.to_string()));
        }

        Ok(Self {
            venue,
            id: id.to_string(),
        })
    }
}

impl std::fmt::Display for ExternalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.venue, self.id)
    }
}

/// NFT collection snapshot as read from the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub address: String,
    pub blockchain: Blockchain,
    pub external_id: ExternalId,
    pub name: String,
    pub image_url: Option<String>,
}

/// Fee schedule attached to a loan option
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Flat fee in base units
    pub fixed: u128,
    /// Percentage fee in basis points of the borrowed amount
    pub rate_bps: u32,
}

/// A configured loan tier on a pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanOption {
    pub duration_blocks: u64,
    pub duration_secs: u64,
    /// Base interest in basis points per block
    pub interest_bps_per_block: u32,
    /// Per-tier override; when present it wins over the base rate everywhere
    pub interest_override_bps_per_block: Option<u32>,
    pub max_ltv_bps: u32,
    #[serde(default)]
    pub fees: FeeSchedule,
}

impl LoanOption {
    /// The single source of truth for interest precedence: an override always
    /// wins over the base rate. Both the loan option calculator and the pool
    /// aggregator sort must go through this function.
    pub fn effective_interest_bps(&self) -> u32 {
        self.interest_override_bps_per_block
            .unwrap_or(self.interest_bps_per_block)
    }
}

/// Lending pool snapshot as read from the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub address: String,
    pub collection_address: String,
    /// Opaque upstream-capital identifier. Compared for equality during
    /// routing only; never a payment address.
    pub fund_source: String,
    pub version: u32,
    pub retired: bool,
    pub loan_options: Vec<LoanOption>,
}

/// Resolved collateral valuation in native base units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Valuation {
    /// Conservative current value (min of floor and 24h average)
    pub value: u128,
    /// Raw trailing 24-hour average
    pub value_24hr: u128,
    /// Optional secondary reference (e.g. per-token estimate)
    pub value_secondary: Option<u128>,
    pub resolved_at: DateTime<Utc>,
    pub venue: Venue,
}

/// A loan tier with its computed borrow limit for a concrete valuation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputedLoanOption {
    pub option: LoanOption,
    pub effective_interest_bps: u32,
    /// `max_ltv_bps / 10_000 * valuation.value`, exact integer arithmetic
    pub max_borrow: u128,
}

/// Signed, block-expiry-bound statement of collateral value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attestation {
    /// bs58-encoded ed25519 signature over the pool's canonical message hash
    pub signature: String,
    pub issued_at_block: u64,
    pub expires_at_block: u64,
}

/// Fully assembled terms offer for one NFT against one pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    pub collection: Collection,
    pub pool_address: String,
    pub nft_id: String,
    pub valuation: Valuation,
    pub options: Vec<ComputedLoanOption>,
    pub attestation: Attestation,
}

/// Reference to an existing on-chain loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRef {
    pub pool_address: String,
    pub loan_id: u64,
}

impl std::fmt::Display for LoanRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.pool_address, self.loan_id)
    }
}

/// Snapshot of an active loan including its on-chain accrued outstanding.
///
/// A closed loan (outstanding of zero) is represented as an absent position,
/// never as a zero record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanPosition {
    pub borrowed: u128,
    pub returned: u128,
    pub interest_accrued: u128,
    pub interest_repaid: u128,
    pub start_block: u64,
    pub expiry_block: u64,
    pub outstanding: u128,
}

/// Result of a liquidity-routing decision. Transient only; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashLoanRoute {
    pub pool_address: String,
    pub idle_capacity: u128,
}

/// Marketplace purchase instruction consumed by the PNPL flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseInstruction {
    /// Marketplace contract to call
    pub to: String,
    /// base64-encoded calldata
    pub calldata: String,
    /// Purchase price in base units
    pub price: u128,
    pub currency: String,
}

/// Rollover product: new terms plus the flash loan that repays the old loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloverTerms {
    pub terms: LoanTerms,
    /// Outstanding debt of the loan being rolled over
    pub outstanding: u128,
    pub flash_loan: FlashLoanRoute,
}

/// PNPL product: purchase instruction, terms and the fronting flash loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PnplTerms {
    pub terms: LoanTerms,
    pub purchase: PurchaseInstruction,
    pub flash_loan: FlashLoanRoute,
}

/// Pool discovery filter; all clauses are conjunctive
#[derive(Debug, Clone, Default)]
pub struct PoolFilter {
    pub blockchain: Option<Blockchain>,
    pub collection_address: Option<String>,
    /// Retired pools are excluded unless explicitly included
    pub include_retired: bool,
    /// Case-insensitive substring match on collection name
    pub name_contains: Option<String>,
}

/// Pool discovery sort keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSort {
    /// Collection name, case- and quote-insensitive, ascending
    Name,
    /// Lowest effective interest across tiers, ascending
    Interest,
    /// Highest max LTV across tiers, descending
    MaxLtv,
}

/// Offset + count pagination, applied after filtering and sorting
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: usize,
    pub count: usize,
}

/// Pool listing entry with freshly read capacity state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolView {
    pub pool: Pool,
    pub collection_name: String,
    pub value_locked: u128,
    pub utilization: u128,
}

impl PoolView {
    pub fn idle_capacity(&self) -> u128 {
        self.value_locked.saturating_sub(self.utilization)
    }
}
