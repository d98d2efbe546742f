//! Loan Position Accountant
//!
//! Outstanding debt is never computed locally from interest-bps math. The
//! raw loan record is handed back to the on-chain accrual function together
//! with an expected transaction speed, so the figure reported here is the
//! figure the settlement contract will actually charge.

use crate::chain::ChainContext;
use crate::errors::LendingResult;
use crate::logger::{self, LogTag};
use crate::types::{LoanPosition, LoanRef};

/// Current outstanding debt of a loan, or `None` when the loan is closed.
///
/// A position is closed exactly when on-chain outstanding is zero; closed
/// loans are reported absent, never as a zero record.
pub async fn compute_outstanding(
    loan: &LoanRef,
    ctx: &ChainContext,
    tx_speed_blocks: u64,
) -> LendingResult<Option<LoanPosition>> {
    let client = ctx.client()?;

    let record = client.loan_record(&loan.pool_address, loan.loan_id).await?;
    let outstanding = client.outstanding(&record, tx_speed_blocks).await?;

    if outstanding == 0 {
        logger::debug(LogTag::Loans, &format!("Loan {} is closed", loan));
        return Ok(None);
    }

    Ok(Some(LoanPosition {
        borrowed: record.borrowed,
        returned: record.returned,
        interest_accrued: record.interest_accrued,
        interest_repaid: record.interest_repaid,
        start_block: record.start_block,
        expiry_block: record.expiry_block,
        outstanding,
    }))
}
