//! # auctionhouse-escrow
//!
//! **Custody plane**: the two program-controlled holdings paired with every
//! auction, and a reference transfer backend.
//!
//! ## Architecture
//!
//! 1. **EscrowLedger**: moves bid funds in and out of an [`EscrowAccount`]
//! 2. **AssetCustodian**: moves the auctioned asset in and out of a [`CustodySlot`]
//! 3. **InMemoryBank**: in-process [`ValueTransfer`] + [`AssetTransfer`]
//!    backend with fault injection
//!
//! Neither the ledger nor the custodian decides *when* to move anything;
//! they are driven exclusively by the auction registry, which owns the
//! accounts and slots under its per-auction lock.
//!
//! [`ValueTransfer`]: auctionhouse_types::ValueTransfer
//! [`AssetTransfer`]: auctionhouse_types::AssetTransfer

pub mod custodian;
pub mod ledger;
pub mod memory;

pub use custodian::{AssetCustodian, CustodySlot};
pub use ledger::{EscrowAccount, EscrowLedger};
pub use memory::InMemoryBank;
