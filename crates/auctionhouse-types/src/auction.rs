//! The auction record and its lifecycle rules.
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  end_auction (now >= end_time)  ┌───────┐
//!   │ ACTIVE ├────────────────────────────────▶│ ENDED │
//!   └────────┘                                 └───────┘
//! ```
//!
//! `Ended` is terminal. The record only validates and applies transitions;
//! moving funds and the asset is the registry's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AssetRef, AuctionError, AuctionId, Identity, ResourceId, ResourceKind, Result, derive,
};

/// Lifecycle status of an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuctionStatus {
    /// Accepting bids until `end_time`, then awaiting settlement.
    Active,
    /// Settled. Asset and funds disbursed exactly once. **Irreversible.**
    Ended,
}

impl std::fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Ended => write!(f, "ENDED"),
        }
    }
}

/// A displaced bid and the amount returned to its bidder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub bidder: Identity,
    pub amount: u64,
}

/// Canonical record for one auction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: AuctionId,
    /// The seller.
    pub authority: Identity,
    pub asset: AssetRef,
    pub min_bid: u64,
    /// Unix seconds.
    pub created_at: i64,
    /// Seconds.
    pub duration: u64,
    /// `created_at + duration`.
    pub end_time: i64,
    pub highest_bid: u64,
    pub highest_bidder: Option<Identity>,
    pub status: AuctionStatus,
    /// Number of accepted bids.
    pub bid_count: u32,
}

impl Auction {
    /// Build a fresh `Active` auction after validating its terms.
    ///
    /// # Errors
    /// `InvalidTerms` if `min_bid` or `duration` is zero, or the end time
    /// does not fit in an `i64`.
    pub fn new(
        id: AuctionId,
        authority: Identity,
        asset: AssetRef,
        min_bid: u64,
        created_at: i64,
        duration: u64,
    ) -> Result<Self> {
        if min_bid == 0 {
            return Err(AuctionError::InvalidTerms {
                reason: "min_bid must be greater than zero".into(),
            });
        }
        if duration == 0 {
            return Err(AuctionError::InvalidTerms {
                reason: "duration must be greater than zero".into(),
            });
        }
        let end_time = i64::try_from(duration)
            .ok()
            .and_then(|d| created_at.checked_add(d))
            .ok_or_else(|| AuctionError::InvalidTerms {
                reason: format!("end time overflows: {created_at} + {duration}"),
            })?;

        Ok(Self {
            id,
            authority,
            asset,
            min_bid,
            created_at,
            duration,
            end_time,
            highest_bid: 0,
            highest_bidder: None,
            status: AuctionStatus::Active,
            bid_count: 0,
        })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == AuctionStatus::Active
    }

    /// Whether the end time has been reached at `now`.
    #[must_use]
    pub fn has_expired(&self, now: i64) -> bool {
        now >= self.end_time
    }

    /// End time as a UTC timestamp, if representable.
    #[must_use]
    pub fn end_time_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.end_time, 0)
    }

    /// Check that `amount` may be placed at `now`. Does not mutate.
    ///
    /// # Errors
    /// `AuctionEnded`, `AuctionExpired` or `BidTooLow`, in that order.
    pub fn check_bid(&self, amount: u64, now: i64) -> Result<()> {
        if !self.is_active() {
            return Err(AuctionError::AuctionEnded(self.id));
        }
        if self.has_expired(now) {
            return Err(AuctionError::AuctionExpired {
                id: self.id,
                end_time: self.end_time,
                now,
            });
        }
        // Strictly greater keeps the bid order total.
        if amount < self.min_bid || amount <= self.highest_bid {
            return Err(AuctionError::BidTooLow {
                offered: amount,
                min_bid: self.min_bid,
                highest: self.highest_bid,
            });
        }
        Ok(())
    }

    /// Install `bidder` as the new high bidder, returning the displaced bid.
    ///
    /// Callers must have passed [`Auction::check_bid`] first.
    pub fn record_bid(&mut self, bidder: Identity, amount: u64) -> Option<Refund> {
        debug_assert!(amount > self.highest_bid);
        let displaced = self.highest_bidder.map(|prev| Refund {
            bidder: prev,
            amount: self.highest_bid,
        });
        self.highest_bid = amount;
        self.highest_bidder = Some(bidder);
        self.bid_count = self.bid_count.saturating_add(1);
        displaced
    }

    /// Check that the auction may be settled at `now`. Does not mutate.
    ///
    /// # Errors
    /// `AuctionAlreadyEnded` or `AuctionNotYetExpired`.
    pub fn check_settle(&self, now: i64) -> Result<()> {
        if !self.is_active() {
            return Err(AuctionError::AuctionAlreadyEnded(self.id));
        }
        if !self.has_expired(now) {
            return Err(AuctionError::AuctionNotYetExpired {
                id: self.id,
                end_time: self.end_time,
                now,
            });
        }
        Ok(())
    }

    /// What settlement will do, given the current high bid.
    #[must_use]
    pub fn planned_outcome(&self) -> SettlementOutcome {
        match self.highest_bidder {
            Some(winner) => SettlementOutcome::Sold {
                auction: self.id,
                asset: self.asset,
                seller: self.authority,
                winner,
                amount: self.highest_bid,
            },
            None => SettlementOutcome::Unsold {
                auction: self.id,
                asset: self.asset,
                seller: self.authority,
            },
        }
    }

    /// Flip to the terminal `Ended` status.
    pub fn mark_ended(&mut self) {
        self.status = AuctionStatus::Ended;
    }

    /// Read-only projection, enriched with escrow state.
    #[must_use]
    pub fn view(&self, escrow_balance: u64, custody_occupied: bool) -> AuctionView {
        AuctionView {
            id: self.id,
            authority: self.authority,
            asset: self.asset,
            min_bid: self.min_bid,
            created_at: self.created_at,
            end_time: self.end_time,
            highest_bid: self.highest_bid,
            highest_bidder: self.highest_bidder,
            status: self.status,
            bid_count: self.bid_count,
            escrow: derive(ResourceKind::Escrow, self.id),
            escrow_balance,
            custody: derive(ResourceKind::Custody, self.id),
            custody_occupied,
        }
    }

    /// Addresses paired with this auction.
    #[must_use]
    pub fn handle(&self) -> AuctionHandle {
        AuctionHandle::new(self.id, self.end_time)
    }
}

/// Read-only snapshot of an auction returned by `get_auction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionView {
    pub id: AuctionId,
    pub authority: Identity,
    pub asset: AssetRef,
    pub min_bid: u64,
    pub created_at: i64,
    pub end_time: i64,
    pub highest_bid: u64,
    pub highest_bidder: Option<Identity>,
    pub status: AuctionStatus,
    pub bid_count: u32,
    pub escrow: ResourceId,
    pub escrow_balance: u64,
    pub custody: ResourceId,
    pub custody_occupied: bool,
}

/// Identifier and derived addresses of a freshly created auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionHandle {
    pub id: AuctionId,
    pub address: ResourceId,
    pub escrow: ResourceId,
    pub custody: ResourceId,
    pub end_time: i64,
}

impl AuctionHandle {
    #[must_use]
    pub fn new(id: AuctionId, end_time: i64) -> Self {
        Self {
            id,
            address: derive(ResourceKind::Auction, id),
            escrow: derive(ResourceKind::Escrow, id),
            custody: derive(ResourceKind::Custody, id),
            end_time,
        }
    }
}

/// Result of a successful `end_auction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    /// Asset went to `winner`, `amount` went to `seller`.
    Sold {
        auction: AuctionId,
        asset: AssetRef,
        seller: Identity,
        winner: Identity,
        amount: u64,
    },
    /// No bids: asset returned to `seller`, no funds moved.
    Unsold {
        auction: AuctionId,
        asset: AssetRef,
        seller: Identity,
    },
}

impl SettlementOutcome {
    /// Who ends up holding the asset.
    #[must_use]
    pub fn asset_recipient(&self) -> Identity {
        match self {
            Self::Sold { winner, .. } => *winner,
            Self::Unsold { seller, .. } => *seller,
        }
    }

    /// Amount paid out to the seller.
    #[must_use]
    pub fn proceeds(&self) -> u64 {
        match self {
            Self::Sold { amount, .. } => *amount,
            Self::Unsold { .. } => 0,
        }
    }

    #[must_use]
    pub fn is_sold(&self) -> bool {
        matches!(self, Self::Sold { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Address;

    const SELLER: Address = Address([1; 32]);
    const B1: Address = Address([2; 32]);
    const B2: Address = Address([3; 32]);
    const ASSET: AssetRef = AssetRef([9; 32]);

    fn auction() -> Auction {
        Auction::new(AuctionId(1), SELLER, ASSET, 1_000_000, 1_000, 3600).unwrap()
    }

    #[test]
    fn new_auction_is_active_and_empty() {
        let a = auction();
        assert_eq!(a.status, AuctionStatus::Active);
        assert_eq!(a.highest_bid, 0);
        assert!(a.highest_bidder.is_none());
        assert_eq!(a.end_time, 4_600);
    }

    #[test]
    fn zero_terms_rejected() {
        let err = Auction::new(AuctionId(1), SELLER, ASSET, 0, 0, 10).unwrap_err();
        assert!(matches!(err, AuctionError::InvalidTerms { .. }));
        let err = Auction::new(AuctionId(1), SELLER, ASSET, 10, 0, 0).unwrap_err();
        assert!(matches!(err, AuctionError::InvalidTerms { .. }));
    }

    #[test]
    fn end_time_overflow_rejected() {
        let err = Auction::new(AuctionId(1), SELLER, ASSET, 10, i64::MAX, 1).unwrap_err();
        assert!(matches!(err, AuctionError::InvalidTerms { .. }));
        let err = Auction::new(AuctionId(1), SELLER, ASSET, 10, 0, u64::MAX).unwrap_err();
        assert!(matches!(err, AuctionError::InvalidTerms { .. }));
    }

    #[test]
    fn bid_below_min_rejected() {
        let err = auction().check_bid(999_999, 1_000).unwrap_err();
        assert!(matches!(err, AuctionError::BidTooLow { .. }));
    }

    #[test]
    fn equal_bid_rejected() {
        let mut a = auction();
        a.check_bid(2_000_000, 1_000).unwrap();
        a.record_bid(B1, 2_000_000);
        let err = a.check_bid(2_000_000, 1_001).unwrap_err();
        assert!(matches!(err, AuctionError::BidTooLow { highest: 2_000_000, .. }));
    }

    #[test]
    fn bid_at_end_time_is_expired() {
        let a = auction();
        assert!(a.check_bid(2_000_000, 4_599).is_ok());
        let err = a.check_bid(2_000_000, 4_600).unwrap_err();
        assert!(matches!(err, AuctionError::AuctionExpired { .. }));
    }

    #[test]
    fn record_bid_returns_displaced() {
        let mut a = auction();
        assert_eq!(a.record_bid(B1, 2_000_000), None);
        let refund = a.record_bid(B2, 3_000_000).unwrap();
        assert_eq!(refund, Refund { bidder: B1, amount: 2_000_000 });
        assert_eq!(a.highest_bidder, Some(B2));
        assert_eq!(a.bid_count, 2);
    }

    #[test]
    fn bid_count_saturates() {
        let mut a = auction();
        a.bid_count = u32::MAX;
        a.record_bid(B1, 2_000_000);
        assert_eq!(a.bid_count, u32::MAX);
        assert_eq!(a.highest_bid, 2_000_000);
    }

    #[test]
    fn settle_gated_by_expiry_and_status() {
        let mut a = auction();
        let err = a.check_settle(4_599).unwrap_err();
        assert!(matches!(err, AuctionError::AuctionNotYetExpired { .. }));
        a.check_settle(4_600).unwrap();
        a.mark_ended();
        let err = a.check_settle(9_999).unwrap_err();
        assert!(matches!(err, AuctionError::AuctionAlreadyEnded(_)));
        let err = a.check_bid(5_000_000, 1_000).unwrap_err();
        assert!(matches!(err, AuctionError::AuctionEnded(_)));
    }

    #[test]
    fn planned_outcome_follows_bids() {
        let mut a = auction();
        let unsold = a.planned_outcome();
        assert!(!unsold.is_sold());
        assert_eq!(unsold.asset_recipient(), SELLER);
        assert_eq!(unsold.proceeds(), 0);

        a.record_bid(B2, 3_000_000);
        let sold = a.planned_outcome();
        assert_eq!(sold.asset_recipient(), B2);
        assert_eq!(sold.proceeds(), 3_000_000);
    }

    #[test]
    fn view_carries_derived_addresses() {
        let a = auction();
        let view = a.view(0, true);
        assert_eq!(view.escrow, derive(ResourceKind::Escrow, AuctionId(1)));
        assert_eq!(view.custody, a.handle().custody);
        assert!(view.custody_occupied);
        assert!(a.end_time_utc().is_some());
    }
}
