//! Loan math and orchestration
//!
//! `options` holds the pure tier math, `position` the on-chain-delegated
//! debt accounting, and `terms` the request orchestration that assembles
//! signed loan terms.

pub mod options;
pub mod position;
pub mod terms;

pub use options::{compute_loan_options, FeePolicy};
pub use position::compute_outstanding;
pub use terms::LendingService;
