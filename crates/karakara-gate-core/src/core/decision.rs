// crates/karakara-gate-core/src/core/decision.rs
// ============================================================================
// Module: Operations and Verdicts
// Description: Topic operation kinds and binary access verdicts.
// Purpose: Shared vocabulary for authorization and verification outcomes.
// Dependencies: serde
// ============================================================================

//! Topic operation kinds and binary verdicts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Broker access mask bit for reads.
pub const ACCESS_READ: u8 = 1;
/// Broker access mask bit for writes.
pub const ACCESS_WRITE: u8 = 2;
/// Broker access mask bit for subscriptions.
pub const ACCESS_SUBSCRIBE: u8 = 4;

/// Topic operation being authorized.
///
/// `Subscribe` grants no read access: delivered messages are checked again as
/// `Read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Subscribe to a topic filter.
    Subscribe,
    /// Receive a message published on a topic.
    Read,
    /// Publish a message to a topic.
    Write,
}

impl Operation {
    /// Maps a broker access mask to an operation.
    ///
    /// Returns `None` for unknown or combined masks.
    #[must_use]
    pub const fn from_access_mask(mask: u8) -> Option<Self> {
        match mask {
            ACCESS_READ => Some(Self::Read),
            ACCESS_WRITE => Some(Self::Write),
            ACCESS_SUBSCRIBE => Some(Self::Subscribe),
            _ => None,
        }
    }

    /// Returns the broker access mask for the operation.
    #[must_use]
    pub const fn access_mask(self) -> u8 {
        match self {
            Self::Read => ACCESS_READ,
            Self::Write => ACCESS_WRITE,
            Self::Subscribe => ACCESS_SUBSCRIBE,
        }
    }

    /// Returns the audit label for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

// ============================================================================
// SECTION: Verdicts
// ============================================================================

/// Binary access verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Access granted.
    Allow,
    /// Access refused.
    Deny,
}

impl Verdict {
    /// Returns true for [`Verdict::Allow`].
    #[must_use]
    pub const fn is_allow(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns the audit label for the verdict.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
