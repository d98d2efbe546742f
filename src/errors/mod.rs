use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Every operation either fully succeeds or fails with exactly one of these
/// variants; no partially-populated success values are returned. Routing
/// exhaustion gets its own variant so callers can present it specifically
/// instead of lumping it in with upstream failures.
#[derive(Error, Debug)]
pub enum LendingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Attestation signer is not configured")]
    SignerNotConfigured,

    #[error("Missing API credential for {venue}")]
    MissingCredential { venue: String },

    #[error("Unsupported valuation venue in external id '{0}'")]
    UnsupportedVenue(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Unknown pool: {0}")]
    UnknownPool(String),

    #[error("Unsupported network id {0}")]
    UnsupportedNetwork(u64),

    #[error("Loan {0} is not active")]
    LoanNotActive(String),

    #[error("Upstream failure from {upstream}: {message}")]
    Upstream { upstream: String, message: String },

    #[error("Invalid loan option on pool {pool}: {reason}")]
    InvalidLoanOption { pool: String, reason: String },

    #[error("No liquidity available to route the requested amount")]
    NoLiquidityAvailable,

    #[error("Operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Invalid amount '{amount}': {reason}")]
    InvalidAmount { amount: String, reason: String },
}

impl LendingError {
    /// Build an upstream failure with the original cause attached.
    pub fn upstream(upstream: impl Into<String>, message: impl std::fmt::Display) -> Self {
        LendingError::Upstream {
            upstream: upstream.into(),
            message: message.to_string(),
        }
    }

    /// Configuration problems are fatal and must never be retried.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            LendingError::Config(_)
                | LendingError::SignerNotConfigured
                | LendingError::MissingCredential { .. }
        )
    }

    /// Whether a caller could reasonably retry the whole request later.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LendingError::Upstream { .. }
                | LendingError::Timeout { .. }
                | LendingError::NoLiquidityAvailable
        )
    }
}

pub type LendingResult<T> = Result<T, LendingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_fatal() {
        assert!(LendingError::SignerNotConfigured.is_config());
        assert!(LendingError::MissingCredential {
            venue: "opensea".to_string()
        }
        .is_config());
        assert!(!LendingError::NoLiquidityAvailable.is_config());
    }

    #[test]
    fn test_upstream_is_recoverable() {
        let err = LendingError::upstream("opensea", "HTTP 502");
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "Upstream failure from opensea: HTTP 502");
    }
}
