//! Loan Option Calculator
//!
//! Pure tier math: no I/O, no floats. Borrow limits are computed in exact
//! integer base-unit arithmetic so server-quoted and contract-verified
//! amounts can never diverge by a rounding bit.

use crate::config::Config;
use crate::errors::{LendingError, LendingResult};
use crate::types::{ComputedLoanOption, FeeSchedule, Pool, Valuation};
use std::collections::HashMap;

/// Fee policy table keyed by currency. Pools of version >= 2 attach the
/// configured fixed plus percentage fee; legacy pools attach none.
#[derive(Debug, Clone, Default)]
pub struct FeePolicy {
    by_currency: HashMap<String, FeeSchedule>,
}

/// First pool version that carries the fee schedule
const FEE_POLICY_MIN_VERSION: u32 = 2;

impl FeePolicy {
    pub fn from_config(config: &Config) -> LendingResult<Self> {
        let mut by_currency = HashMap::new();
        for fee in &config.fees {
            let fixed = if fee.fixed.is_empty() {
                0
            } else {
                fee.fixed
                    .parse::<u128>()
                    .map_err(|e| LendingError::Config(format!(
                        "Invalid fixed fee '{}' for {}: {}",
                        fee.fixed, fee.currency, e
                    )))?
            };
            by_currency.insert(
                fee.currency.clone(),
                FeeSchedule {
                    fixed,
                    rate_bps: fee.rate_bps,
                },
            );
        }
        Ok(Self { by_currency })
    }

    /// The fee schedule for a (currency, pool version) pair
    pub fn fees_for(&self, currency: &str, pool_version: u32) -> FeeSchedule {
        if pool_version < FEE_POLICY_MIN_VERSION {
            return FeeSchedule::default();
        }
        self.by_currency.get(currency).cloned().unwrap_or_default()
    }
}

/// `max_ltv_bps / 10_000 * value`, exact.
///
/// Split to avoid intermediate overflow: with value = 10_000*q + r,
/// floor(value * ltv / 10_000) == q*ltv + floor(r*ltv / 10_000).
pub fn max_borrow(max_ltv_bps: u32, value: u128) -> LendingResult<u128> {
    let ltv = max_ltv_bps as u128;
    let quotient = value / 10_000;
    let remainder = value % 10_000;

    quotient
        .checked_mul(ltv)
        .and_then(|q| q.checked_add(remainder * ltv / 10_000))
        .ok_or_else(|| LendingError::InvalidAmount {
            amount: value.to_string(),
            reason: "borrow limit overflows".to_string(),
        })
}

/// Turn a pool's configured tiers and a resolved valuation into concrete
/// borrow limits, effective rates and fees.
pub fn compute_loan_options(
    pool: &Pool,
    valuation: &Valuation,
    currency: &str,
    fee_policy: &FeePolicy,
) -> LendingResult<Vec<ComputedLoanOption>> {
    let fees = fee_policy.fees_for(currency, pool.version);

    pool.loan_options
        .iter()
        .map(|tier| {
            if tier.max_ltv_bps == 0 || tier.max_ltv_bps > 10_000 {
                return Err(LendingError::InvalidLoanOption {
                    pool: pool.address.clone(),
                    reason: format!("max LTV {} bps out of range", tier.max_ltv_bps),
                });
            }
            if tier.duration_blocks == 0 {
                return Err(LendingError::InvalidLoanOption {
                    pool: pool.address.clone(),
                    reason: "zero duration".to_string(),
                });
            }

            let mut option = tier.clone();
            option.fees = fees.clone();

            Ok(ComputedLoanOption {
                effective_interest_bps: option.effective_interest_bps(),
                max_borrow: max_borrow(option.max_ltv_bps, valuation.value)?,
                option,
            })
        })
        .collect()
}
