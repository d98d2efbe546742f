//! Off-chain core of an NFT-collateralized lending protocol.
//!
//! The crate resolves collateral valuations from external venues, turns pool
//! tier configuration into concrete signed loan terms, reports on-chain loan
//! positions and routes flash-loan liquidity for rollover and
//! purchase-now-pay-later flows. All financial arithmetic is exact integer
//! math in native base units; figures the contracts own (accrual, message
//! hashing) are delegated on-chain rather than recomputed here.

pub mod chain;
pub mod config;
pub mod directory;
pub mod errors;
pub mod loans;
pub mod logger;
pub mod marketplace;
pub mod pools;
pub mod routing;
pub mod signer;
pub mod types;
pub mod valuation;

pub use chain::{ChainClient, ChainContext, ClientRegistry};
pub use directory::{PoolDirectory, SnapshotDirectory};
pub use errors::{LendingError, LendingResult};
pub use loans::LendingService;
pub use valuation::ValuationResolver;
