//! # auctionhouse-types
//!
//! Shared types, errors, and configuration for the **AuctionHouse** engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`AuctionId`], [`Address`] (aliased [`Identity`] / [`ResourceId`]), [`AssetRef`]
//! - **Derivation**: [`derive`] and [`ResourceKind`]
//! - **Auction model**: [`Auction`], [`AuctionStatus`], [`AuctionView`], [`AuctionHandle`], [`SettlementOutcome`], [`Refund`]
//! - **Audit trail**: [`AuctionEvent`]
//! - **Collaborators**: [`ValueTransfer`], [`AssetTransfer`], [`TransferError`]
//! - **Configuration**: [`AuctionConfig`], [`SettlementPolicy`]
//! - **Errors**: [`AuctionError`] with `AH_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod auction;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod transfer;

pub use auction::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use transfer::*;

// Constants are accessed via `auctionhouse_types::constants::FOO`
// (not re-exported to avoid name collisions).
