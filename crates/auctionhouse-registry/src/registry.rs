//! The auction registry — canonical records and their transitions.
//!
//! Each auction lives in its own [`AuctionEntry`] together with its escrow
//! account, custody slot and event log, behind one `Mutex`. Every mutating
//! operation holds that mutex from validation to commit, so no other
//! operation on the same auction can observe a half-applied transition.
//! The outer map lock is only held to look an entry up or to insert one.
//!
//! The registry also remembers every address derived for a reserved or
//! live auction. Those addresses are auction-owned resources and are
//! refused as sellers or bidders, so no call can move value out of another
//! auction's escrow or custody slot.
//!
//! Within an operation, local state is changed on working copies and
//! written back only after every external transfer succeeded. External
//! transfers that already happened when a later leg fails are undone by a
//! compensating transfer.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use auctionhouse_escrow::{AssetCustodian, CustodySlot, EscrowAccount, EscrowLedger};
use auctionhouse_types::{
    AssetRef, AssetTransfer, Auction, AuctionConfig, AuctionError, AuctionEvent, AuctionHandle,
    AuctionId, AuctionStatus, AuctionView, Identity, ResourceId, Result, SettlementOutcome,
    SettlementPolicy, ValueTransfer, derive_all,
};

use crate::clock::Clock;

/// Everything owned by one auction: a single serializable unit.
struct AuctionEntry {
    auction: Auction,
    escrow: EscrowAccount,
    custody: CustodySlot,
    events: VecDeque<AuctionEvent>,
    /// Set when a compensating transfer failed; blocks further mutation.
    poisoned: Option<String>,
}

impl AuctionEntry {
    fn ensure_healthy(&self) -> Result<()> {
        match &self.poisoned {
            Some(reason) => Err(AuctionError::Internal(format!(
                "{} is halted: {reason}",
                self.auction.id
            ))),
            None => Ok(()),
        }
    }

    fn record(&mut self, event: AuctionEvent, cap: usize) {
        self.events.push_back(event);
        while self.events.len() > cap {
            // Creation and settlement are kept; trim the oldest bid.
            match self
                .events
                .iter()
                .position(|e| matches!(e, AuctionEvent::BidPlaced { .. }))
            {
                Some(idx) => {
                    self.events.remove(idx);
                }
                None => break,
            }
        }
    }

    fn check_invariants(&self) -> Result<()> {
        let auction = &self.auction;
        let violation = |reason: String| Err(AuctionError::InvariantViolation { reason });

        match auction.status {
            AuctionStatus::Active => {
                if self.escrow.balance() != auction.highest_bid {
                    return violation(format!(
                        "{}: escrow holds {} but highest bid is {}",
                        auction.id,
                        self.escrow.balance(),
                        auction.highest_bid
                    ));
                }
                if (auction.highest_bid == 0) != auction.highest_bidder.is_none() {
                    return violation(format!(
                        "{}: highest bid {} disagrees with bidder {:?}",
                        auction.id, auction.highest_bid, auction.highest_bidder
                    ));
                }
                if self.custody.held() != Some(auction.asset) {
                    return violation(format!("{}: active auction without asset in custody", auction.id));
                }
            }
            AuctionStatus::Ended => {
                if self.escrow.balance() != 0 {
                    return violation(format!(
                        "{}: ended auction still escrows {}",
                        auction.id,
                        self.escrow.balance()
                    ));
                }
                if self.custody.is_occupied() {
                    return violation(format!("{}: ended auction still holds asset", auction.id));
                }
            }
        }
        Ok(())
    }

    fn view(&self) -> AuctionView {
        self.auction
            .view(self.escrow.balance(), self.custody.is_occupied())
    }
}

enum Slot {
    /// Creation in progress: custody transfer not yet confirmed.
    Reserved,
    Live(Arc<Mutex<AuctionEntry>>),
}

fn lock(entry: &Mutex<AuctionEntry>) -> MutexGuard<'_, AuctionEntry> {
    entry.lock().unwrap_or_else(|poisoned| {
        // The panicking holder may have moved value without writing the
        // entry back; halt the auction instead of trusting the mirror.
        let mut guard = poisoned.into_inner();
        if guard.poisoned.is_none() {
            tracing::error!(auction = %guard.auction.id, "Operation panicked mid-transition");
            guard.poisoned = Some("an operation panicked mid-transition".to_owned());
        }
        entry.clear_poison();
        guard
    })
}

#[derive(Default)]
struct Index {
    slots: HashMap<AuctionId, Slot>,
    /// Derived addresses of every reserved or live auction.
    derived: HashSet<ResourceId>,
}

impl Index {
    fn live(&self, id: AuctionId) -> Result<Arc<Mutex<AuctionEntry>>> {
        match self.slots.get(&id) {
            Some(Slot::Live(entry)) => Ok(Arc::clone(entry)),
            Some(Slot::Reserved) | None => Err(AuctionError::AuctionNotFound(id)),
        }
    }

    fn ensure_participant(&self, who: Identity) -> Result<()> {
        if self.derived.contains(&who) {
            return Err(AuctionError::ReservedAddress(who));
        }
        Ok(())
    }
}

/// Arena of auctions addressed by identifier.
pub struct AuctionRegistry {
    auctions: RwLock<Index>,
    ledger: EscrowLedger,
    custodian: AssetCustodian,
    clock: Arc<dyn Clock>,
    config: AuctionConfig,
}

impl AuctionRegistry {
    /// Build a registry over the given transfer collaborators.
    ///
    /// # Errors
    /// `Configuration` if `config` does not validate.
    pub fn new(
        config: AuctionConfig,
        value: Arc<dyn ValueTransfer>,
        assets: Arc<dyn AssetTransfer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            auctions: RwLock::new(Index::default()),
            ledger: EscrowLedger::new(value),
            custodian: AssetCustodian::new(assets),
            clock,
            config,
        })
    }

    /// Open a new auction and take the asset into custody.
    ///
    /// # Errors
    /// - `InvalidTerms` for a zero min bid, zero or over-long duration
    /// - `DuplicateAuction` if `id` is taken (or being created)
    /// - `ReservedAddress` if `seller` is an auction-owned address
    /// - `AssetTransferFailed` if custody intake fails; nothing is registered
    pub fn create_auction(
        &self,
        id: AuctionId,
        min_bid: u64,
        duration: u64,
        seller: Identity,
        asset: AssetRef,
    ) -> Result<AuctionHandle> {
        if duration > self.config.max_duration_secs {
            return Err(AuctionError::InvalidTerms {
                reason: format!(
                    "duration {duration}s exceeds maximum {}s",
                    self.config.max_duration_secs
                ),
            });
        }
        let now = self.clock.now();
        let auction = Auction::new(id, seller, asset, min_bid, now, duration)?;

        let owned = derive_all(id);
        {
            let mut index = self.write_index();
            if index.slots.contains_key(&id) {
                return Err(AuctionError::DuplicateAuction(id));
            }
            index.ensure_participant(seller)?;
            if owned.contains(&seller) {
                return Err(AuctionError::ReservedAddress(seller));
            }
            index.slots.insert(id, Slot::Reserved);
            index.derived.extend(owned);
        }

        let mut custody = CustodySlot::new(id);
        if let Err(err) = self.custodian.take_custody(&mut custody, seller, asset) {
            let mut index = self.write_index();
            index.slots.remove(&id);
            for address in &owned {
                index.derived.remove(address);
            }
            drop(index);
            tracing::warn!(auction = %id, seller = %seller, error = %err, "Auction creation rolled back");
            return Err(err);
        }

        let handle = auction.handle();
        let mut entry = AuctionEntry {
            escrow: EscrowAccount::new(id),
            custody,
            events: VecDeque::new(),
            poisoned: None,
            auction,
        };
        entry.record(
            AuctionEvent::Created {
                seller,
                asset,
                min_bid,
                end_time: handle.end_time,
                at: now,
            },
            self.config.max_history_events,
        );

        self.write_index()
            .slots
            .insert(id, Slot::Live(Arc::new(Mutex::new(entry))));

        tracing::info!(
            auction = %id,
            seller = %seller,
            %asset,
            min_bid,
            end_time = handle.end_time,
            "Auction created"
        );
        Ok(handle)
    }

    /// Place a strictly higher bid, refunding the displaced bidder in full.
    ///
    /// The new bid is deposited first; if the refund then fails, the
    /// deposit is returned and the previous bidder keeps its position.
    ///
    /// The index stays read-locked for the whole call, so no auction can
    /// claim `bidder` as a derived address while the deposit is in flight.
    ///
    /// # Errors
    /// `AuctionNotFound`, `ReservedAddress`, `AuctionEnded`,
    /// `AuctionExpired`, `BidTooLow`, `DepositFailed`, `RefundFailed`;
    /// `Internal` if the compensating return itself failed.
    pub fn place_bid(&self, id: AuctionId, bidder: Identity, amount: u64) -> Result<()> {
        let index = self.read_index();
        let entry = index.live(id)?;
        index.ensure_participant(bidder)?;
        let mut guard = lock(&entry);
        guard.ensure_healthy()?;

        let now = self.clock.now();
        if let Err(err) = guard.auction.check_bid(amount, now) {
            tracing::debug!(auction = %id, bidder = %bidder, amount, error = %err, "Bid rejected");
            return Err(err);
        }

        let mut auction = guard.auction.clone();
        let mut escrow = guard.escrow.clone();
        let displaced = auction.record_bid(bidder, amount);

        if let Err(err) = self.ledger.deposit(&mut escrow, bidder, amount) {
            tracing::warn!(auction = %id, bidder = %bidder, amount, error = %err, "Bid deposit failed");
            return Err(err);
        }

        if let Some(refund) = &displaced {
            if let Err(err) = self.ledger.refund(&mut escrow, refund) {
                tracing::warn!(
                    auction = %id,
                    displaced = %refund.bidder,
                    amount = refund.amount,
                    error = %err,
                    "Refund failed, returning new deposit"
                );
                if let Err(comp) = self.ledger.withdraw(&mut escrow, bidder, amount) {
                    let reason = format!("deposit of {amount} from {bidder} not returned: {comp}");
                    tracing::error!(auction = %id, %reason, "Bid compensation failed");
                    guard.escrow = escrow;
                    guard.poisoned = Some(reason.clone());
                    return Err(AuctionError::Internal(reason));
                }
                return Err(err);
            }
        }

        guard.auction = auction;
        guard.escrow = escrow;
        guard.record(
            AuctionEvent::BidPlaced {
                bidder,
                amount,
                displaced,
                at: now,
            },
            self.config.max_history_events,
        );

        tracing::info!(
            auction = %id,
            bidder = %bidder,
            amount,
            refunded = displaced.map_or(0, |r| r.amount),
            "Bid accepted"
        );
        Ok(())
    }

    /// Settle an expired auction.
    ///
    /// Sold: the escrow balance goes to the seller, then the asset goes to
    /// the winner; a failed asset leg pulls the payout back into escrow.
    /// Unsold: the asset returns to the seller and no funds move.
    ///
    /// # Errors
    /// `AuctionNotFound`, `AuctionAlreadyEnded`, `AuctionNotYetExpired`,
    /// `Unauthorized`, `FundTransferFailed`, `AssetTransferFailed`,
    /// `InvariantViolation`; `Internal` if the compensation failed.
    /// On every error the auction stays `Active`.
    pub fn end_auction(&self, id: AuctionId, caller: Identity) -> Result<SettlementOutcome> {
        let entry = self.entry(id)?;
        let mut guard = lock(&entry);
        guard.ensure_healthy()?;

        let now = self.clock.now();
        guard.auction.check_settle(now)?;
        if self.config.settlement_policy == SettlementPolicy::SellerOnly
            && caller != guard.auction.authority
        {
            return Err(AuctionError::Unauthorized { id, caller });
        }
        guard.check_invariants()?;

        let mut escrow = guard.escrow.clone();
        let mut custody = guard.custody.clone();
        let outcome = guard.auction.planned_outcome();

        match outcome {
            SettlementOutcome::Sold { seller, winner, .. } => {
                let payout = escrow.balance();
                if let Err(err) = self.ledger.withdraw(&mut escrow, seller, payout) {
                    tracing::warn!(auction = %id, seller = %seller, error = %err, "Seller payout failed");
                    return Err(err);
                }
                if let Err(err) = self.custodian.release(&mut custody, winner) {
                    tracing::warn!(
                        auction = %id,
                        winner = %winner,
                        error = %err,
                        "Asset delivery failed, reclaiming payout"
                    );
                    if let Err(comp) = self.ledger.deposit(&mut escrow, seller, payout) {
                        let reason = format!("payout of {payout} to {seller} not reclaimed: {comp}");
                        tracing::error!(auction = %id, %reason, "Settlement compensation failed");
                        guard.escrow = escrow;
                        guard.poisoned = Some(reason.clone());
                        return Err(AuctionError::Internal(reason));
                    }
                    return Err(err);
                }
            }
            SettlementOutcome::Unsold { seller, .. } => {
                if let Err(err) = self.custodian.release(&mut custody, seller) {
                    tracing::warn!(auction = %id, seller = %seller, error = %err, "Asset return failed");
                    return Err(err);
                }
            }
        }

        guard.auction.mark_ended();
        guard.escrow = escrow;
        guard.custody = custody;
        guard.record(
            AuctionEvent::Settled { outcome, at: now },
            self.config.max_history_events,
        );

        tracing::info!(
            auction = %id,
            caller = %caller,
            recipient = %outcome.asset_recipient(),
            proceeds = outcome.proceeds(),
            "Auction settled"
        );
        Ok(outcome)
    }

    /// Read-only projection of one auction.
    #[must_use]
    pub fn get_auction(&self, id: AuctionId) -> Option<AuctionView> {
        let entry = self.entry(id).ok()?;
        let guard = lock(&entry);
        Some(guard.view())
    }

    /// Committed events of one auction, oldest first.
    pub fn events(&self, id: AuctionId) -> Result<Vec<AuctionEvent>> {
        let entry = self.entry(id)?;
        let guard = lock(&entry);
        Ok(guard.events.iter().cloned().collect())
    }

    /// Balance of the auction's escrow account.
    pub fn escrow_balance(&self, id: AuctionId) -> Result<u64> {
        let entry = self.entry(id)?;
        let guard = lock(&entry);
        Ok(self.ledger.balance(&guard.escrow))
    }

    /// Asset currently in the auction's custody slot, if any.
    pub fn custody_asset(&self, id: AuctionId) -> Result<Option<AssetRef>> {
        let entry = self.entry(id)?;
        let guard = lock(&entry);
        Ok(guard.custody.held())
    }

    /// Re-check that the record agrees with escrow and custody.
    ///
    /// # Errors
    /// `AuctionNotFound` or `InvariantViolation`.
    pub fn verify_invariants(&self, id: AuctionId) -> Result<()> {
        let entry = self.entry(id)?;
        let guard = lock(&entry);
        guard.check_invariants()
    }

    /// Number of registered auctions (creations in flight excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_index()
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::Live(_)))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, id: AuctionId) -> Result<Arc<Mutex<AuctionEntry>>> {
        self.read_index().live(id)
    }

    fn read_index(&self) -> RwLockReadGuard<'_, Index> {
        self.auctions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, Index> {
        self.auctions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use auctionhouse_escrow::InMemoryBank;
    use auctionhouse_types::{Address, constants};

    use super::*;
    use crate::clock::ManualClock;

    const SELLER: Address = Address([1; 32]);
    const B1: Address = Address([2; 32]);
    const B2: Address = Address([3; 32]);
    const ASSET: AssetRef = AssetRef([9; 32]);

    fn setup(config: AuctionConfig) -> (AuctionRegistry, Arc<InMemoryBank>, Arc<ManualClock>) {
        let bank = Arc::new(InMemoryBank::new());
        let clock = Arc::new(ManualClock::new(1_000));
        bank.mint_asset(ASSET, SELLER);
        bank.fund(B1, 10_000);
        bank.fund(B2, 10_000);
        let registry =
            AuctionRegistry::new(config, bank.clone(), bank.clone(), clock.clone()).unwrap();
        (registry, bank, clock)
    }

    #[test]
    fn invalid_config_rejected() {
        let bank = Arc::new(InMemoryBank::new());
        let config = AuctionConfig {
            max_history_events: 0,
            ..AuctionConfig::default()
        };
        let err = AuctionRegistry::new(config, bank.clone(), bank, Arc::new(ManualClock::new(0)))
            .err()
            .unwrap();
        assert!(matches!(err, AuctionError::Configuration(_)));
    }

    #[test]
    fn over_long_duration_is_invalid_terms() {
        let (registry, bank, _) = setup(AuctionConfig::default());
        let err = registry
            .create_auction(AuctionId(1), 10, constants::DEFAULT_MAX_DURATION_SECS + 1, SELLER, ASSET)
            .unwrap_err();
        assert!(matches!(err, AuctionError::InvalidTerms { .. }));
        assert_eq!(bank.owner_of(ASSET), Some(SELLER));
        assert!(registry.is_empty());
    }

    #[test]
    fn failed_custody_releases_reservation() {
        let (registry, _bank, _) = setup(AuctionConfig::default());
        let foreign = AssetRef([5; 32]);
        let err = registry
            .create_auction(AuctionId(1), 10, 60, SELLER, foreign)
            .unwrap_err();
        assert!(matches!(err, AuctionError::AssetTransferFailed(_)));
        assert!(registry.get_auction(AuctionId(1)).is_none());

        registry
            .create_auction(AuctionId(1), 10, 60, SELLER, ASSET)
            .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn seller_only_policy_blocks_strangers() {
        let config = AuctionConfig {
            settlement_policy: SettlementPolicy::SellerOnly,
            ..AuctionConfig::default()
        };
        let (registry, bank, clock) = setup(config);
        registry
            .create_auction(AuctionId(1), 100, 60, SELLER, ASSET)
            .unwrap();
        registry.place_bid(AuctionId(1), B1, 500).unwrap();
        clock.advance(60);

        let err = registry.end_auction(AuctionId(1), B1).unwrap_err();
        assert!(matches!(err, AuctionError::Unauthorized { caller, .. } if caller == B1));
        assert_eq!(
            registry.get_auction(AuctionId(1)).unwrap().status,
            AuctionStatus::Active
        );

        let outcome = registry.end_auction(AuctionId(1), SELLER).unwrap();
        assert_eq!(outcome.asset_recipient(), B1);
        assert_eq!(bank.balance(SELLER), 500);
    }

    #[test]
    fn history_cap_trims_oldest_bids() {
        let config = AuctionConfig {
            max_history_events: 3,
            ..AuctionConfig::default()
        };
        let (registry, _bank, _) = setup(config);
        registry
            .create_auction(AuctionId(1), 1, 60, SELLER, ASSET)
            .unwrap();
        for amount in 1..=4 {
            registry.place_bid(AuctionId(1), B1, amount).unwrap();
        }

        let events = registry.events(AuctionId(1)).unwrap();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], AuctionEvent::Created { .. }));
        assert!(matches!(events[1], AuctionEvent::BidPlaced { amount: 3, .. }));
        assert!(matches!(events[2], AuctionEvent::BidPlaced { amount: 4, .. }));
    }

    /// Value collaborator that blows up inside the transfer call.
    struct PanickingTransfer;

    impl ValueTransfer for PanickingTransfer {
        fn transfer(
            &self,
            _from: Address,
            _to: Address,
            _amount: u64,
        ) -> std::result::Result<(), auctionhouse_types::TransferError> {
            panic!("collaborator crashed");
        }
    }

    #[test]
    fn panic_mid_bid_halts_auction() {
        let bank = Arc::new(InMemoryBank::new());
        bank.mint_asset(ASSET, SELLER);
        let registry = AuctionRegistry::new(
            AuctionConfig::default(),
            Arc::new(PanickingTransfer),
            bank.clone(),
            Arc::new(ManualClock::new(1_000)),
        )
        .unwrap();
        registry
            .create_auction(AuctionId(1), 100, 60, SELLER, ASSET)
            .unwrap();

        let crashed = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            registry.place_bid(AuctionId(1), B1, 500)
        }));
        assert!(crashed.is_err());

        let err = registry.place_bid(AuctionId(1), B2, 600).unwrap_err();
        assert!(matches!(err, AuctionError::Internal(_)));
        let view = registry.get_auction(AuctionId(1)).unwrap();
        assert_eq!(view.status, AuctionStatus::Active);
        assert_eq!(view.highest_bid, 0);
    }

    #[test]
    fn failed_creation_frees_derived_addresses() {
        let (registry, bank, _) = setup(AuctionConfig::default());
        let foreign = AssetRef([5; 32]);
        registry
            .create_auction(AuctionId(2), 10, 60, SELLER, foreign)
            .unwrap_err();
        assert!(registry.read_index().derived.is_empty());

        let handle = registry
            .create_auction(AuctionId(2), 10, 60, SELLER, ASSET)
            .unwrap();
        let index = registry.read_index();
        assert!(index.derived.contains(&handle.escrow));
        assert!(index.derived.contains(&handle.custody));
        drop(index);
        assert_eq!(bank.owner_of(ASSET), Some(handle.custody));
    }

    #[test]
    fn self_outbid_refunds_own_previous_bid() {
        let (registry, bank, _) = setup(AuctionConfig::default());
        registry
            .create_auction(AuctionId(1), 100, 60, SELLER, ASSET)
            .unwrap();
        registry.place_bid(AuctionId(1), B1, 200).unwrap();
        registry.place_bid(AuctionId(1), B1, 300).unwrap();

        assert_eq!(registry.escrow_balance(AuctionId(1)).unwrap(), 300);
        assert_eq!(bank.balance(B1), 9_700);
        registry.verify_invariants(AuctionId(1)).unwrap();
    }
}
