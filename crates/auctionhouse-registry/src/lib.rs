//! # auctionhouse-registry
//!
//! **Auction Registry**: the canonical record of every auction and the only
//! component allowed to drive its escrow and custody.
//!
//! ## Architecture
//!
//! The registry receives `create_auction`, `place_bid` and `end_auction`
//! calls and, for each one:
//! 1. Locks the auction's entry (record + escrow + custody, one unit)
//! 2. Validates preconditions against the record and the [`Clock`]
//! 3. Drives the [`EscrowLedger`] and [`AssetCustodian`]
//! 4. Commits the new record state and appends an audit event
//!
//! Operations on different auctions share no mutable state and run in
//! parallel; operations on the same auction are linearized by its lock.
//!
//! ## Lifecycle
//!
//! ```text
//! create_auction → Active ─┬─ place_bid (while now < end_time, strictly increasing)
//!                          └─ end_auction (now >= end_time) → Ended
//! ```
//!
//! [`EscrowLedger`]: auctionhouse_escrow::EscrowLedger
//! [`AssetCustodian`]: auctionhouse_escrow::AssetCustodian

pub mod clock;
pub mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::AuctionRegistry;
