//! Configuration for an auction registry.

use serde::{Deserialize, Serialize};

use crate::{AuctionError, Result, constants};

/// Who may call `end_auction` once an auction has expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementPolicy {
    /// Any caller may crank settlement; the outcome does not depend on who.
    #[default]
    Anyone,
    /// Only the seller may settle.
    SellerOnly,
}

/// Registry-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuctionConfig {
    /// Longest accepted auction duration, in seconds.
    pub max_duration_secs: u64,
    /// Settlement authorization policy.
    pub settlement_policy: SettlementPolicy,
    /// Audit events retained per auction; the oldest bid events are dropped first.
    pub max_history_events: usize,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: constants::DEFAULT_MAX_DURATION_SECS,
            settlement_policy: SettlementPolicy::Anyone,
            max_history_events: constants::DEFAULT_MAX_HISTORY_EVENTS,
        }
    }
}

impl AuctionConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    ///
    /// # Errors
    /// `Configuration` on malformed JSON or out-of-range values.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the registry cannot operate under.
    ///
    /// # Errors
    /// `Configuration` if a limit is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_duration_secs == 0 {
            return Err(AuctionError::Configuration(
                "max_duration_secs must be greater than zero".into(),
            ));
        }
        if self.max_history_events == 0 {
            return Err(AuctionError::Configuration(
                "max_history_events must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
