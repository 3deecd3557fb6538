// crates/karakara-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: Auth Gate
// Description: Broker-facing credential and topic authorization entry points.
// Purpose: Combine origin trust, the rule table and the identity authority.
// Dependencies: crate::core, crate::interfaces, crate::audit, tracing
// ============================================================================

//! ## Overview
//! [`AuthGate`] answers the two questions the broker asks:
//! - [`AuthGate::authenticate`]: may this connection log in?
//! - [`AuthGate::authorize`]: may this connection perform this topic
//!   operation? [`AuthGate::authorize_access_mask`] asks the same with the
//!   broker's raw access mask.
//!
//! Trusted origins never reach the identity authority. Gateway connections
//! must present both an identity and a secret, and only an authority answer of
//! HTTP 200 admits them. Every decision is recorded through the configured
//! [`AuditSink`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::audit::AccessAuditEvent;
use crate::audit::CredentialAuditEvent;
use crate::audit::CredentialReason;
use crate::core::ConnectionContext;
use crate::core::Operation;
use crate::core::Secret;
use crate::core::Verdict;
use crate::interfaces::AuditSink;
use crate::interfaces::CredentialVerifier;
use crate::interfaces::VerificationOutcome;
use crate::runtime::rules::AccessRequest;
use crate::runtime::rules::RuleTable;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Credential value matched by the legacy test bypass.
pub const LEGACY_TEST_CREDENTIAL: &str = "test";

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Authentication and authorization gate for one broker.
///
/// The gate is shared across connections; it holds no per-connection state.
#[derive(Clone)]
pub struct AuthGate {
    /// Topic authorization rules.
    rules: Arc<RuleTable>,
    /// Identity authority client.
    verifier: Arc<dyn CredentialVerifier>,
    /// Decision audit sink.
    audit: Arc<dyn AuditSink>,
    /// Admit gateway credentials whose identity or secret is the test value.
    legacy_test_bypass: bool,
}

impl AuthGate {
    /// Creates a gate with the legacy test bypass disabled.
    #[must_use]
    pub fn new(
        rules: RuleTable,
        verifier: Arc<dyn CredentialVerifier>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            rules: Arc::new(rules),
            verifier,
            audit,
            legacy_test_bypass: false,
        }
    }

    /// Enables or disables the legacy test credential bypass.
    #[must_use]
    pub const fn with_legacy_test_bypass(mut self, enabled: bool) -> Self {
        self.legacy_test_bypass = enabled;
        self
    }

    /// Returns the rule table.
    #[must_use]
    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Authorizes a topic operation for an established connection.
    #[must_use]
    pub fn authorize(
        &self,
        connection: &ConnectionContext,
        operation: Operation,
        topic: &str,
    ) -> Verdict {
        let request =
            AccessRequest::new(connection.origin(), connection.identity(), operation, topic);
        let decision = self.rules.evaluate(&request);
        self.audit.record_access(&AccessAuditEvent::new(&request, connection.address(), &decision));
        decision.verdict
    }

    /// Authorizes a topic check expressed as a broker access mask.
    ///
    /// Masks that name no known operation are still decided and recorded:
    /// trusted origins are allowed, everyone else reaches the default deny.
    #[must_use]
    pub fn authorize_access_mask(
        &self,
        connection: &ConnectionContext,
        access_mask: u8,
        topic: &str,
    ) -> Verdict {
        if let Some(operation) = Operation::from_access_mask(access_mask) {
            return self.authorize(connection, operation, topic);
        }
        let decision = self.rules.evaluate_unknown_operation(connection.origin());
        self.audit.record_access(&AccessAuditEvent::unknown_operation(
            connection,
            access_mask,
            topic,
            &decision,
        ));
        decision.verdict
    }

    /// Checks connection credentials.
    ///
    /// Suspends only while the identity authority is consulted.
    pub async fn authenticate(
        &self,
        connection: &ConnectionContext,
        secret: Option<&Secret>,
    ) -> Verdict {
        let (verdict, reason, status) = self.resolve_credentials(connection, secret).await;
        self.audit.record_credentials(&CredentialAuditEvent::new(
            connection, verdict, reason, status,
        ));
        verdict
    }

    /// Resolves the credential verdict without recording it.
    async fn resolve_credentials(
        &self,
        connection: &ConnectionContext,
        secret: Option<&Secret>,
    ) -> (Verdict, CredentialReason, Option<u16>) {
        if connection.origin().is_trusted() {
            return (Verdict::Allow, CredentialReason::TrustedOrigin, None);
        }
        let (Some(identity), Some(secret)) = (connection.identity(), secret) else {
            return (Verdict::Deny, CredentialReason::MissingCredentials, None);
        };
        if self.legacy_test_bypass
            && (identity.as_str() == LEGACY_TEST_CREDENTIAL
                || secret.expose() == LEGACY_TEST_CREDENTIAL)
        {
            return (Verdict::Allow, CredentialReason::LegacyTestBypass, None);
        }
        let outcome = self.verifier.verify(identity, secret).await;
        let reason = match outcome {
            VerificationOutcome::Accepted {
                ..
            } => CredentialReason::AuthorityAccepted,
            VerificationOutcome::Rejected {
                ..
            } => CredentialReason::AuthorityRejected,
            VerificationOutcome::Unavailable => CredentialReason::AuthorityUnavailable,
        };
        (outcome.verdict(), reason, outcome.status())
    }
}
