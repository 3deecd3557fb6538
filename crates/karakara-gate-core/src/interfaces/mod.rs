// crates/karakara-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Karakara Gate Interfaces
// Description: Backend-agnostic seams for credential checks and audit output.
// Purpose: Let hosts plug in identity authorities and log pipelines.
// Dependencies: async-trait, crate::core, crate::audit
// ============================================================================

//! ## Overview
//! The gate consumes two external collaborators: a [`CredentialVerifier`]
//! that consults the identity authority, and an [`AuditSink`] that records
//! decisions. Implementations must be fail-closed: any ambiguity in a
//! verifier resolves to a non-accepting outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Serialize;

use crate::audit::AccessAuditEvent;
use crate::audit::CredentialAuditEvent;
use crate::core::Identity;
use crate::core::Secret;
use crate::core::Verdict;

// ============================================================================
// SECTION: Credential Verification
// ============================================================================

/// Outcome of a single identity-authority exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Authority answered HTTP 200.
    Accepted {
        /// Response status code.
        status: u16,
    },
    /// Authority answered with any other status.
    Rejected {
        /// Response status code.
        status: u16,
    },
    /// The exchange could not be built or completed.
    Unavailable,
}

impl VerificationOutcome {
    /// Collapses the outcome to a verdict. Only `Accepted` allows.
    #[must_use]
    pub const fn verdict(self) -> Verdict {
        match self {
            Self::Accepted {
                ..
            } => Verdict::Allow,
            Self::Rejected {
                ..
            }
            | Self::Unavailable => Verdict::Deny,
        }
    }

    /// Returns the response status when one was received.
    #[must_use]
    pub const fn status(self) -> Option<u16> {
        match self {
            Self::Accepted {
                status,
            }
            | Self::Rejected {
                status,
            } => Some(status),
            Self::Unavailable => None,
        }
    }
}

/// Identity authority client.
///
/// Verification is the only operation in the gate allowed to suspend. Callers
/// run it inside a per-connection task so one slow authority call never stalls
/// unrelated connections.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Checks an identity and secret against the authority.
    ///
    /// Implementations never retry and never cache.
    async fn verify(&self, identity: &Identity, secret: &Secret) -> VerificationOutcome;
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Sink for gate decision records.
///
/// Sinks are observational: failures to record are swallowed and never change
/// a verdict.
pub trait AuditSink: Send + Sync {
    /// Records an authorization decision.
    fn record_access(&self, event: &AccessAuditEvent);

    /// Records a credential check decision.
    fn record_credentials(&self, event: &CredentialAuditEvent);
}
