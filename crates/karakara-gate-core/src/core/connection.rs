// crates/karakara-gate-core/src/core/connection.rs
// ============================================================================
// Module: Connection Context
// Description: Origin classification for broker client connections.
// Purpose: Tag each connection once as internal, raw-protocol, or gateway.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`ConnectionContext`] is built when a client connects. The origin is
//! derived exactly once from the transport address and protocol kind and
//! cannot change for the life of the context:
//! - no address: [`Origin::Internal`] (the broker's own bridges)
//! - native MQTT: [`Origin::RawTrusted`] (reserved for internal services)
//! - websockets gateway: [`Origin::GatewayUntrusted`]

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::Identity;

// ============================================================================
// SECTION: Protocol & Origin
// ============================================================================

/// Transport protocol a client connected with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    /// Native MQTT over TCP.
    Mqtt,
    /// MQTT bridged through the browser-facing websockets gateway.
    Websockets,
}

impl ProtocolKind {
    /// Returns the wire label for the protocol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mqtt => "mqtt",
            Self::Websockets => "websockets",
        }
    }
}

/// Trust classification of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Connection from inside the broker process.
    Internal,
    /// Native wire-protocol connection used to bootstrap internal services.
    RawTrusted,
    /// Browser gateway connection; subject to verification and authorization.
    GatewayUntrusted,
}

impl Origin {
    /// Returns true when the origin bypasses verification and authorization.
    #[must_use]
    pub const fn is_trusted(self) -> bool {
        matches!(self, Self::Internal | Self::RawTrusted)
    }

    /// Returns the audit label for the origin.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::RawTrusted => "raw_trusted",
            Self::GatewayUntrusted => "gateway_untrusted",
        }
    }
}

/// Classifies a connection from its transport facts.
#[must_use]
pub const fn classify(address: Option<&str>, protocol: ProtocolKind) -> Origin {
    if address.is_none() {
        return Origin::Internal;
    }
    match protocol {
        ProtocolKind::Mqtt => Origin::RawTrusted,
        ProtocolKind::Websockets => Origin::GatewayUntrusted,
    }
}

// ============================================================================
// SECTION: Connection Context
// ============================================================================

/// Facts about a single client connection.
///
/// # Invariants
/// - `origin` is computed by [`classify`] at construction and never re-derived.
/// - The context is immutable; verification results are returned, not stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    /// Origin classification.
    origin: Origin,
    /// Raw transport address, absent for internal connections.
    address: Option<String>,
    /// Protocol the client connected with.
    protocol: ProtocolKind,
    /// Identity presented at connect time.
    identity: Option<Identity>,
}

impl ConnectionContext {
    /// Builds a context for a newly established connection.
    #[must_use]
    pub fn establish(
        address: Option<String>,
        protocol: ProtocolKind,
        identity: Option<Identity>,
    ) -> Self {
        let origin = classify(address.as_deref(), protocol);
        Self {
            origin,
            address,
            protocol,
            identity,
        }
    }

    /// Returns the origin classification.
    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    /// Returns the transport address, if any.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Returns the protocol kind.
    #[must_use]
    pub const fn protocol(&self) -> ProtocolKind {
        self.protocol
    }

    /// Returns the presented identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
