//! Error types for the AuctionHouse engine.
//!
//! All errors use the `AH_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by class:
//! - 1xx: Validation errors (rejected before any mutation)
//! - 2xx: Temporal errors (depend on the wall clock)
//! - 3xx: Terminal-state errors (permanent for the auction)
//! - 4xx: Transfer errors (collaborator failures, nothing committed)
//! - 5xx: Authorization errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Address, AuctionId, Identity, ResourceId, TransferError};

/// Central error enum for all AuctionHouse operations.
#[derive(Debug, Error)]
pub enum AuctionError {
    // =================================================================
    // Validation Errors (1xx)
    // =================================================================
    /// No auction is registered under this identifier.
    #[error("AH_ERR_100: Auction not found: {0}")]
    AuctionNotFound(AuctionId),

    /// The auction terms are unusable (zero min bid, zero duration, ...).
    #[error("AH_ERR_101: Invalid auction terms: {reason}")]
    InvalidTerms { reason: String },

    /// An auction with this identifier already exists.
    #[error("AH_ERR_102: Auction already exists: {0}")]
    DuplicateAuction(AuctionId),

    /// The bid is below the minimum or not strictly above the current high.
    #[error("AH_ERR_103: Bid too low: offered {offered}, min bid {min_bid}, highest {highest}")]
    BidTooLow {
        offered: u64,
        min_bid: u64,
        highest: u64,
    },

    /// The participant address belongs to an auction-owned resource.
    #[error("AH_ERR_104: Address {0} is an auction-owned resource, not a participant")]
    ReservedAddress(Address),

    // =================================================================
    // Temporal Errors (2xx)
    // =================================================================
    /// Bidding closed: the auction reached its end time.
    #[error("AH_ERR_200: Auction {id} expired at {end_time} (now {now})")]
    AuctionExpired { id: AuctionId, end_time: i64, now: i64 },

    /// Settlement attempted before the end time.
    #[error("AH_ERR_201: Auction {id} runs until {end_time} (now {now})")]
    AuctionNotYetExpired { id: AuctionId, end_time: i64, now: i64 },

    // =================================================================
    // Terminal-State Errors (3xx)
    // =================================================================
    /// The auction is settled; no further bids are accepted.
    #[error("AH_ERR_300: Auction ended: {0}")]
    AuctionEnded(AuctionId),

    /// The auction is settled; it cannot be settled again.
    #[error("AH_ERR_301: Auction already ended: {0}")]
    AuctionAlreadyEnded(AuctionId),

    // =================================================================
    // Transfer Errors (4xx)
    // =================================================================
    /// Returning the displaced bid to its bidder failed.
    #[error("AH_ERR_400: Refund failed: {0}")]
    RefundFailed(#[source] TransferError),

    /// Moving the new bid into escrow failed.
    #[error("AH_ERR_401: Deposit failed: {0}")]
    DepositFailed(#[source] TransferError),

    /// Moving the asset into or out of custody failed.
    #[error("AH_ERR_402: Asset transfer failed: {0}")]
    AssetTransferFailed(#[source] TransferError),

    /// Paying the seller out of escrow failed.
    #[error("AH_ERR_403: Fund transfer failed: {0}")]
    FundTransferFailed(#[source] TransferError),

    /// Escrow withdrawal larger than the escrow balance.
    #[error("AH_ERR_404: Insufficient escrow funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },

    /// Custody release on a slot that holds nothing.
    #[error("AH_ERR_405: Custody slot {0} is empty")]
    EmptyCustodySlot(ResourceId),

    /// Custody intake on a slot that already holds an asset.
    #[error("AH_ERR_406: Custody slot {0} is occupied")]
    CustodySlotOccupied(ResourceId),

    // =================================================================
    // Authorization Errors (5xx)
    // =================================================================
    /// The caller may not perform this operation under the active policy.
    #[error("AH_ERR_500: Unauthorized caller {caller} for {id}")]
    Unauthorized { id: AuctionId, caller: Identity },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error (e.g. a failed compensating transfer).
    #[error("AH_ERR_900: Internal error: {0}")]
    Internal(String),

    /// A recorded state disagrees with escrow or custody.
    #[error("AH_ERR_901: Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// Configuration error (malformed document, out-of-range value).
    #[error("AH_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Coarse error class, used by callers to decide whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Temporal,
    Terminal,
    Transfer,
    Authorization,
    Internal,
}

impl AuctionError {
    /// The class this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AuctionNotFound(_)
            | Self::InvalidTerms { .. }
            | Self::DuplicateAuction(_)
            | Self::BidTooLow { .. }
            | Self::ReservedAddress(_) => ErrorKind::Validation,
            Self::AuctionExpired { .. } | Self::AuctionNotYetExpired { .. } => ErrorKind::Temporal,
            Self::AuctionEnded(_) | Self::AuctionAlreadyEnded(_) => ErrorKind::Terminal,
            Self::RefundFailed(_)
            | Self::DepositFailed(_)
            | Self::AssetTransferFailed(_)
            | Self::FundTransferFailed(_)
            | Self::InsufficientFunds { .. }
            | Self::EmptyCustodySlot(_)
            | Self::CustodySlotOccupied(_) => ErrorKind::Transfer,
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::Internal(_) | Self::InvariantViolation { .. } | Self::Configuration(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether the same call may succeed later without changing the auction.
    ///
    /// Transfer errors are retryable by the caller; the engine itself never
    /// retries a fund movement.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Validation | ErrorKind::Temporal | ErrorKind::Transfer
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, AuctionError>;

impl From<serde_json::Error> for AuctionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = AuctionError::AuctionNotFound(AuctionId(3));
        let msg = format!("{err}");
        assert!(msg.starts_with("AH_ERR_100"), "Got: {msg}");
        assert!(msg.contains("auction:3"));
    }

    #[test]
    fn bid_too_low_display() {
        let err = AuctionError::BidTooLow {
            offered: 2_500_000,
            min_bid: 1_000_000,
            highest: 3_000_000,
        };
        let msg = format!("{err}");
        assert!(msg.contains("AH_ERR_103"));
        assert!(msg.contains("2500000"));
        assert!(msg.contains("3000000"));
    }

    #[test]
    fn transfer_errors_keep_source() {
        use std::error::Error as _;

        let err = AuctionError::RefundFailed(TransferError::Rejected("frozen".into()));
        let source = err.source().expect("source attached");
        assert!(source.to_string().contains("frozen"));
    }

    #[test]
    fn kinds_and_retryability() {
        assert_eq!(
            AuctionError::DuplicateAuction(AuctionId(1)).kind(),
            ErrorKind::Validation
        );
        assert!(
            AuctionError::AuctionNotYetExpired {
                id: AuctionId(1),
                end_time: 10,
                now: 5
            }
            .is_retryable()
        );
        assert!(!AuctionError::AuctionEnded(AuctionId(1)).is_retryable());
        assert!(!AuctionError::AuctionAlreadyEnded(AuctionId(1)).is_retryable());
        assert!(AuctionError::DepositFailed(TransferError::Overflow).is_retryable());
        assert!(!AuctionError::Internal("x".into()).is_retryable());
    }

    #[test]
    fn all_errors_have_ah_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(AuctionError::InvalidTerms { reason: "x".into() }),
            Box::new(AuctionError::AuctionEnded(AuctionId(1))),
            Box::new(AuctionError::ReservedAddress(crate::Address([0; 32]))),
            Box::new(AuctionError::EmptyCustodySlot(crate::Address([0; 32]))),
            Box::new(AuctionError::InsufficientFunds {
                needed: 2,
                available: 1,
            }),
            Box::new(AuctionError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("AH_ERR_"),
                "Error missing AH_ERR_ prefix: {msg}"
            );
        }
    }
}
