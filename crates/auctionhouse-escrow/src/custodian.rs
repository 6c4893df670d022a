//! Asset custodian — temporary custody of the auctioned asset.
//!
//! A [`CustodySlot`] holds at most one asset, from auction creation until
//! settlement. Intake into an occupied slot and release from an empty one
//! are both refused, which is what stops a double settlement from handing
//! the asset out twice.

use std::sync::Arc;

use auctionhouse_types::{
    AssetRef, AssetTransfer, AuctionError, AuctionId, Identity, ResourceId, ResourceKind, Result,
    derive,
};

/// The custody holding of one auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodySlot {
    address: ResourceId,
    held: Option<AssetRef>,
}

impl CustodySlot {
    /// Empty slot at the address derived for `auction`.
    #[must_use]
    pub fn new(auction: AuctionId) -> Self {
        Self {
            address: derive(ResourceKind::Custody, auction),
            held: None,
        }
    }

    #[must_use]
    pub fn address(&self) -> ResourceId {
        self.address
    }

    #[must_use]
    pub fn held(&self) -> Option<AssetRef> {
        self.held
    }

    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.held.is_some()
    }
}

/// Moves assets into and out of custody slots.
#[derive(Clone)]
pub struct AssetCustodian {
    transfer: Arc<dyn AssetTransfer>,
}

impl AssetCustodian {
    #[must_use]
    pub fn new(transfer: Arc<dyn AssetTransfer>) -> Self {
        Self { transfer }
    }

    /// Take `asset` from `from` into `slot`.
    ///
    /// # Errors
    /// - `CustodySlotOccupied` if the slot already holds an asset
    /// - `AssetTransferFailed` if the collaborator rejects the transfer
    pub fn take_custody(&self, slot: &mut CustodySlot, from: Identity, asset: AssetRef) -> Result<()> {
        if slot.held.is_some() {
            return Err(AuctionError::CustodySlotOccupied(slot.address));
        }

        self.transfer
            .transfer_asset(from, slot.address, asset)
            .map_err(AuctionError::AssetTransferFailed)?;

        slot.held = Some(asset);
        tracing::debug!(slot = %slot.address, from = %from, %asset, "Asset taken into custody");
        Ok(())
    }

    /// Hand the held asset to `to`, emptying the slot.
    ///
    /// # Errors
    /// - `EmptyCustodySlot` if nothing is held (e.g. already released)
    /// - `AssetTransferFailed` if the collaborator rejects the transfer
    pub fn release(&self, slot: &mut CustodySlot, to: Identity) -> Result<AssetRef> {
        let asset = slot
            .held
            .ok_or(AuctionError::EmptyCustodySlot(slot.address))?;

        self.transfer
            .transfer_asset(slot.address, to, asset)
            .map_err(AuctionError::AssetTransferFailed)?;

        slot.held = None;
        tracing::debug!(slot = %slot.address, to = %to, %asset, "Asset released from custody");
        Ok(asset)
    }
}

#[cfg(test)]
mod tests {
    use auctionhouse_types::Address;

    use super::*;
    use crate::InMemoryBank;

    const SELLER: Address = Address([1; 32]);
    const WINNER: Address = Address([2; 32]);
    const ASSET: AssetRef = AssetRef([7; 32]);

    fn setup() -> (Arc<InMemoryBank>, AssetCustodian, CustodySlot) {
        let bank = Arc::new(InMemoryBank::new());
        bank.mint_asset(ASSET, SELLER);
        let custodian = AssetCustodian::new(bank.clone());
        (bank, custodian, CustodySlot::new(AuctionId(1)))
    }

    #[test]
    fn take_custody_moves_asset_into_slot() {
        let (bank, custodian, mut slot) = setup();
        custodian.take_custody(&mut slot, SELLER, ASSET).unwrap();

        assert_eq!(slot.held(), Some(ASSET));
        assert_eq!(bank.owner_of(ASSET), Some(slot.address()));
    }

    #[test]
    fn take_custody_from_non_owner_fails_cleanly() {
        let (bank, custodian, mut slot) = setup();
        let err = custodian.take_custody(&mut slot, WINNER, ASSET).unwrap_err();

        assert!(matches!(err, AuctionError::AssetTransferFailed(_)));
        assert!(!slot.is_occupied());
        assert_eq!(bank.owner_of(ASSET), Some(SELLER));
    }

    #[test]
    fn occupied_slot_refuses_intake() {
        let (bank, custodian, mut slot) = setup();
        custodian.take_custody(&mut slot, SELLER, ASSET).unwrap();

        let other = AssetRef([8; 32]);
        bank.mint_asset(other, SELLER);
        let err = custodian.take_custody(&mut slot, SELLER, other).unwrap_err();
        assert!(matches!(err, AuctionError::CustodySlotOccupied(_)));
        assert_eq!(bank.owner_of(other), Some(SELLER));
    }

    #[test]
    fn release_hands_asset_over() {
        let (bank, custodian, mut slot) = setup();
        custodian.take_custody(&mut slot, SELLER, ASSET).unwrap();

        let released = custodian.release(&mut slot, WINNER).unwrap();
        assert_eq!(released, ASSET);
        assert!(!slot.is_occupied());
        assert_eq!(bank.owner_of(ASSET), Some(WINNER));
    }

    #[test]
    fn double_release_is_empty_slot() {
        let (_bank, custodian, mut slot) = setup();
        custodian.take_custody(&mut slot, SELLER, ASSET).unwrap();
        custodian.release(&mut slot, WINNER).unwrap();

        let err = custodian.release(&mut slot, WINNER).unwrap_err();
        assert!(matches!(err, AuctionError::EmptyCustodySlot(addr) if addr == slot.address()));
    }

    #[test]
    fn failed_release_keeps_asset_in_slot() {
        let (bank, custodian, mut slot) = setup();
        custodian.take_custody(&mut slot, SELLER, ASSET).unwrap();
        bank.block_incoming(WINNER);

        let err = custodian.release(&mut slot, WINNER).unwrap_err();
        assert!(matches!(err, AuctionError::AssetTransferFailed(_)));
        assert_eq!(slot.held(), Some(ASSET));
        assert_eq!(bank.owner_of(ASSET), Some(slot.address()));
    }
}
