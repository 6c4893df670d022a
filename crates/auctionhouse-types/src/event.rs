//! Audit events for committed auction transitions.
//!
//! Every successful `create_auction`, `place_bid` and `end_auction`
//! appends exactly one [`AuctionEvent`] to the auction's log. Failed
//! operations leave no event behind.

use serde::{Deserialize, Serialize};

use crate::{AssetRef, Identity, Refund, SettlementOutcome};

/// A committed state transition of one auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuctionEvent {
    /// Asset taken into custody, auction opened.
    Created {
        seller: Identity,
        asset: AssetRef,
        min_bid: u64,
        end_time: i64,
        at: i64,
    },
    /// A new high bid was accepted; `displaced` was refunded in full.
    BidPlaced {
        bidder: Identity,
        amount: u64,
        displaced: Option<Refund>,
        at: i64,
    },
    /// The auction was settled.
    Settled { outcome: SettlementOutcome, at: i64 },
}

impl AuctionEvent {
    /// Unix timestamp at which the transition committed.
    #[must_use]
    pub fn at(&self) -> i64 {
        match self {
            Self::Created { at, .. } | Self::BidPlaced { at, .. } | Self::Settled { at, .. } => {
                *at
            }
        }
    }
}

impl std::fmt::Display for AuctionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created { .. } => write!(f, "CREATED"),
            Self::BidPlaced { .. } => write!(f, "BID_PLACED"),
            Self::Settled { .. } => write!(f, "SETTLED"),
        }
    }
}
