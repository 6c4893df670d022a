//! Escrow ledger — custody of bid funds.
//!
//! An [`EscrowAccount`] lives at the address derived from its auction and
//! mirrors what the value collaborator holds there. The [`EscrowLedger`]
//! moves funds through the collaborator and updates the mirror only after
//! the transfer succeeded, so a failed call leaves the account unchanged.

use std::sync::Arc;

use auctionhouse_types::{
    AuctionError, AuctionId, Identity, Refund, ResourceId, ResourceKind, Result, TransferError,
    ValueTransfer, derive,
};

/// The escrow holding of one auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowAccount {
    address: ResourceId,
    balance: u64,
}

impl EscrowAccount {
    /// Empty escrow at the address derived for `auction`.
    #[must_use]
    pub fn new(auction: AuctionId) -> Self {
        Self {
            address: derive(ResourceKind::Escrow, auction),
            balance: 0,
        }
    }

    #[must_use]
    pub fn address(&self) -> ResourceId {
        self.address
    }

    #[must_use]
    pub fn balance(&self) -> u64 {
        self.balance
    }
}

/// Moves funds into and out of escrow accounts.
///
/// Holds no balances itself; accounts are owned by the caller, which
/// serializes access per auction.
#[derive(Clone)]
pub struct EscrowLedger {
    transfer: Arc<dyn ValueTransfer>,
}

impl EscrowLedger {
    #[must_use]
    pub fn new(transfer: Arc<dyn ValueTransfer>) -> Self {
        Self { transfer }
    }

    /// Pull `amount` from `from` into escrow.
    ///
    /// # Errors
    /// `DepositFailed` if the balance would overflow or the collaborator
    /// rejects the transfer.
    pub fn deposit(&self, account: &mut EscrowAccount, from: Identity, amount: u64) -> Result<()> {
        let credited = account
            .balance
            .checked_add(amount)
            .ok_or(AuctionError::DepositFailed(TransferError::Overflow))?;

        self.transfer
            .transfer(from, account.address, amount)
            .map_err(AuctionError::DepositFailed)?;

        account.balance = credited;
        tracing::debug!(
            escrow = %account.address,
            from = %from,
            amount,
            balance = account.balance,
            "Escrow deposit"
        );
        Ok(())
    }

    /// Pay `amount` out of escrow to `recipient`.
    ///
    /// # Errors
    /// - `InsufficientFunds` if `amount` exceeds the escrow balance
    /// - `FundTransferFailed` if the collaborator rejects the transfer
    pub fn withdraw(
        &self,
        account: &mut EscrowAccount,
        recipient: Identity,
        amount: u64,
    ) -> Result<()> {
        self.withdraw_with(account, recipient, amount, AuctionError::FundTransferFailed)
    }

    /// Return a displaced bid to its bidder, in full.
    ///
    /// # Errors
    /// - `InsufficientFunds` if escrow holds less than the refund
    /// - `RefundFailed` if the collaborator rejects the transfer
    pub fn refund(&self, account: &mut EscrowAccount, refund: &Refund) -> Result<()> {
        self.withdraw_with(account, refund.bidder, refund.amount, AuctionError::RefundFailed)
    }

    /// Current balance of `account`.
    #[must_use]
    pub fn balance(&self, account: &EscrowAccount) -> u64 {
        account.balance
    }

    fn withdraw_with(
        &self,
        account: &mut EscrowAccount,
        recipient: Identity,
        amount: u64,
        on_failure: fn(TransferError) -> AuctionError,
    ) -> Result<()> {
        if amount > account.balance {
            return Err(AuctionError::InsufficientFunds {
                needed: amount,
                available: account.balance,
            });
        }

        self.transfer
            .transfer(account.address, recipient, amount)
            .map_err(on_failure)?;

        account.balance -= amount;
        tracing::debug!(
            escrow = %account.address,
            to = %recipient,
            amount,
            balance = account.balance,
            "Escrow withdrawal"
        );
        Ok(())
    }
}
