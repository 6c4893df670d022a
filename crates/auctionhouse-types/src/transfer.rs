//! External transfer collaborators.
//!
//! The auction engine never moves value itself. It drives two primitives
//! owned by the surrounding system: a fungible value transfer and an asset
//! ownership transfer. Both are all-or-nothing: an `Err` means nothing moved.

use thiserror::Error;

use crate::{Address, AssetRef};

/// Failure reported by a transfer collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The source account does not hold enough value.
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    /// The source account does not own the asset.
    #[error("{asset} is not owned by {owner}")]
    NotOwner { asset: AssetRef, owner: Address },

    /// The destination balance would overflow.
    #[error("balance overflow")]
    Overflow,

    /// The collaborator refused the transfer for its own reasons.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Atomic fungible value transfer (lamports, tokens, cents...).
pub trait ValueTransfer: Send + Sync {
    fn transfer(&self, from: Address, to: Address, amount: u64) -> Result<(), TransferError>;
}

/// Atomic ownership transfer of a single non-fungible asset.
pub trait AssetTransfer: Send + Sync {
    fn transfer_asset(&self, from: Address, to: Address, asset: AssetRef)
    -> Result<(), TransferError>;
}
