// crates/karakara-gate-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared verifier and audit doubles for karakara-gate-core tests.
// Purpose: Observe gate decisions without a live identity authority.
// Dependencies: karakara-gate-core, async-trait
// ============================================================================

//! ## Overview
//! Provides scripted [`CredentialVerifier`] doubles and a recording
//! [`AuditSink`] so tests can assert on both verdicts and audit trails.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use karakara_gate_core::AccessAuditEvent;
use karakara_gate_core::AuditSink;
use karakara_gate_core::AuthGate;
use karakara_gate_core::ConnectionContext;
use karakara_gate_core::CredentialAuditEvent;
use karakara_gate_core::CredentialVerifier;
use karakara_gate_core::Identity;
use karakara_gate_core::ProtocolKind;
use karakara_gate_core::RulePolicy;
use karakara_gate_core::RuleTable;
use karakara_gate_core::Secret;
use karakara_gate_core::VerificationOutcome;

// ============================================================================
// SECTION: Verifiers
// ============================================================================

/// Verifier that returns a fixed outcome and counts calls.
pub struct ScriptedVerifier {
    /// Outcome returned for every call.
    outcome: VerificationOutcome,
    /// Number of verify calls observed.
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    /// Verifier returning `outcome` for every call.
    pub fn new(outcome: VerificationOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    /// Verifier that always answers 200.
    pub fn accepting() -> Arc<Self> {
        Self::new(VerificationOutcome::Accepted {
            status: 200,
        })
    }

    /// Verifier that always answers `status`.
    pub fn rejecting(status: u16) -> Arc<Self> {
        Self::new(VerificationOutcome::Rejected {
            status,
        })
    }

    /// Verifier whose authority is never reachable.
    pub fn unavailable() -> Arc<Self> {
        Self::new(VerificationOutcome::Unavailable)
    }

    /// Returns the number of verify calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialVerifier for ScriptedVerifier {
    async fn verify(&self, _identity: &Identity, _secret: &Secret) -> VerificationOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
    }
}

/// Verifier that accepts exactly one identity/secret pair.
pub struct PasswordVerifier {
    /// Accepted identity.
    identity: String,
    /// Accepted secret.
    secret: String,
}

impl PasswordVerifier {
    /// Verifier accepting only `identity` with `secret`.
    pub fn new(identity: &str, secret: &str) -> Arc<Self> {
        Arc::new(Self {
            identity: identity.to_string(),
            secret: secret.to_string(),
        })
    }
}

#[async_trait]
impl CredentialVerifier for PasswordVerifier {
    async fn verify(&self, identity: &Identity, secret: &Secret) -> VerificationOutcome {
        if identity.as_str() == self.identity && secret.expose() == self.secret {
            VerificationOutcome::Accepted {
                status: 200,
            }
        } else {
            VerificationOutcome::Rejected {
                status: 403,
            }
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct RecordingAuditSink {
    /// Recorded access events.
    pub access: Mutex<Vec<AccessAuditEvent>>,
    /// Recorded credential events.
    pub credentials: Mutex<Vec<CredentialAuditEvent>>,
}

impl RecordingAuditSink {
    /// Creates an empty shared sink.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of access events.
    pub fn access_events(&self) -> Vec<AccessAuditEvent> {
        self.access.lock().unwrap().clone()
    }

    /// Snapshot of credential events.
    pub fn credential_events(&self) -> Vec<CredentialAuditEvent> {
        self.credentials.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record_access(&self, event: &AccessAuditEvent) {
        self.access.lock().unwrap().push(event.clone());
    }

    fn record_credentials(&self, event: &CredentialAuditEvent) {
        self.credentials.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Standard table with default karakara policy.
pub fn standard_table() -> RuleTable {
    RuleTable::standard(&RulePolicy::default())
}

/// Gate over the standard table with the given collaborators.
pub fn gate_with(verifier: Arc<dyn CredentialVerifier>, audit: Arc<dyn AuditSink>) -> AuthGate {
    AuthGate::new(standard_table(), verifier, audit)
}

/// Browser-gateway connection for the given identity.
pub fn gateway(identity: Option<&str>) -> ConnectionContext {
    ConnectionContext::establish(
        Some("198.51.100.7".to_string()),
        ProtocolKind::Websockets,
        identity.map(Identity::new),
    )
}

/// Native wire-protocol connection for the given identity.
pub fn raw(identity: Option<&str>) -> ConnectionContext {
    ConnectionContext::establish(
        Some("10.1.2.3".to_string()),
        ProtocolKind::Mqtt,
        identity.map(Identity::new),
    )
}

/// Internal (address-less) connection.
pub fn internal() -> ConnectionContext {
    ConnectionContext::establish(None, ProtocolKind::Mqtt, None)
}
