//! System-wide constants for the AuctionHouse engine.

/// Default upper bound on auction duration: 30 days, in seconds.
pub const DEFAULT_MAX_DURATION_SECS: u64 = 30 * 24 * 60 * 60;

/// Default cap on audit events retained per auction.
pub const DEFAULT_MAX_HISTORY_EVENTS: usize = 1_024;

