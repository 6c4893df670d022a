//! In-memory transfer backend.
//!
//! Holds fungible balances per [`Address`] and the owner of every asset.
//! Each transfer is all-or-nothing. Directional blocks let tests make a
//! specific leg fail: a blocked incoming address rejects every transfer
//! *to* it, a blocked outgoing address rejects every transfer *from* it.

use std::{
    collections::{HashMap, HashSet},
    sync::{Mutex, PoisonError},
};

use auctionhouse_types::{Address, AssetRef, AssetTransfer, TransferError, ValueTransfer};

#[derive(Default)]
struct BankState {
    balances: HashMap<Address, u64>,
    owners: HashMap<AssetRef, Address>,
    blocked_incoming: HashSet<Address>,
    blocked_outgoing: HashSet<Address>,
}

impl BankState {
    fn check_route(&self, from: Address, to: Address) -> Result<(), TransferError> {
        if self.blocked_outgoing.contains(&from) {
            return Err(TransferError::Rejected(format!("outgoing blocked for {from}")));
        }
        if self.blocked_incoming.contains(&to) {
            return Err(TransferError::Rejected(format!("incoming blocked for {to}")));
        }
        Ok(())
    }
}

/// Reference backend implementing both transfer collaborators.
#[derive(Default)]
pub struct InMemoryBank {
    state: Mutex<BankState>,
}

impl InMemoryBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, BankState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credit `amount` to `account` out of thin air (airdrop / faucet).
    pub fn fund(&self, account: Address, amount: u64) {
        let mut state = self.state();
        let balance = state.balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Create `asset` owned by `owner`, replacing any previous owner.
    pub fn mint_asset(&self, asset: AssetRef, owner: Address) {
        self.state().owners.insert(asset, owner);
    }

    #[must_use]
    pub fn balance(&self, account: Address) -> u64 {
        self.state().balances.get(&account).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn owner_of(&self, asset: AssetRef) -> Option<Address> {
        self.state().owners.get(&asset).copied()
    }

    /// Sum of every balance. Transfers never change it.
    #[must_use]
    pub fn total_supply(&self) -> u128 {
        self.state().balances.values().map(|b| u128::from(*b)).sum()
    }

    /// Reject every transfer whose destination is `account`.
    pub fn block_incoming(&self, account: Address) {
        self.state().blocked_incoming.insert(account);
    }

    /// Reject every transfer whose source is `account`.
    pub fn block_outgoing(&self, account: Address) {
        self.state().blocked_outgoing.insert(account);
    }

    /// Lift every block.
    pub fn clear_blocks(&self) {
        let mut state = self.state();
        state.blocked_incoming.clear();
        state.blocked_outgoing.clear();
    }
}

impl ValueTransfer for InMemoryBank {
    fn transfer(&self, from: Address, to: Address, amount: u64) -> Result<(), TransferError> {
        let mut state = self.state();
        state.check_route(from, to)?;

        let available = state.balances.get(&from).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = state
            .balances
            .get(&to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        state.balances.insert(from, available - amount);
        state.balances.insert(to, credited);
        Ok(())
    }
}

impl AssetTransfer for InMemoryBank {
    fn transfer_asset(
        &self,
        from: Address,
        to: Address,
        asset: AssetRef,
    ) -> Result<(), TransferError> {
        let mut state = self.state();
        state.check_route(from, to)?;

        if state.owners.get(&asset) != Some(&from) {
            return Err(TransferError::NotOwner { asset, owner: from });
        }
        state.owners.insert(asset, to);
        Ok(())
    }
}
