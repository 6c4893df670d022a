//! Identifiers and deterministic address derivation.
//!
//! Every participant and every program-controlled resource is named by a
//! 32-byte [`Address`]. Auction-owned resources (the record itself, its
//! escrow and its custody slot) are never allocated: their addresses are
//! derived from the auction identifier alone, so one identifier always maps
//! to exactly one resource of each kind.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// AuctionId
// ---------------------------------------------------------------------------

/// Caller-supplied auction identifier. Immutable once the auction exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AuctionId(pub u64);

impl AuctionId {
    /// Little-endian bytes, as fed into address derivation.
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl From<u64> for AuctionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for AuctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "auction:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 32-byte account key: a bidder, a seller, or a derived resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// A fresh random address.
    #[cfg(feature = "test-helpers")]
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Identity of a human participant (seller, bidder, settlement caller).
pub type Identity = Address;

/// Address of a program-controlled resource derived from an [`AuctionId`].
pub type ResourceId = Address;

// ---------------------------------------------------------------------------
// AssetRef
// ---------------------------------------------------------------------------

/// Reference to the non-fungible asset being auctioned (e.g. a mint key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AssetRef(pub [u8; 32]);

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset:{}", hex::encode(&self.0[..8]))
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// The kinds of resource paired with every auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// The auction record.
    Auction,
    /// The escrow account holding the current winning bid.
    Escrow,
    /// The custody slot holding the auctioned asset.
    Custody,
}

impl ResourceKind {
    /// Fixed namespace tag hashed into the derived address.
    #[must_use]
    pub fn tag(self) -> &'static [u8] {
        match self {
            Self::Auction => b"auction",
            Self::Escrow => b"escrow",
            Self::Custody => b"auction_token_account",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auction => write!(f, "AUCTION"),
            Self::Escrow => write!(f, "ESCROW"),
            Self::Custody => write!(f, "CUSTODY"),
        }
    }
}

/// Derive the address of `kind` for auction `id`.
///
/// `SHA-256("auctionhouse:" || tag || ":" || id_le)`. Pure and reproducible:
/// the same `(kind, id)` always yields the same address, and the domain
/// separator keeps the three kinds disjoint.
#[must_use]
pub fn derive(kind: ResourceKind, id: AuctionId) -> ResourceId {
    let mut hasher = Sha256::new();
    hasher.update(b"auctionhouse:");
    hasher.update(kind.tag());
    hasher.update(b":");
    hasher.update(id.to_le_bytes());
    Address(hasher.finalize().into())
}

/// Every address derived for auction `id`, one per [`ResourceKind`].
#[must_use]
pub fn derive_all(id: AuctionId) -> [ResourceId; 3] {
    [ResourceKind::Auction, ResourceKind::Escrow, ResourceKind::Custody].map(|kind| derive(kind, id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
