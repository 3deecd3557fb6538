// crates/karakara-gate-core/src/audit.rs
// ============================================================================
// Module: Gate Audit Logging
// Description: Structured audit events for credential and topic decisions.
// Purpose: Record every gate verdict without influencing control flow.
// Dependencies: serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! Every authorization and credential decision produces one audit event. The
//! default [`TracingAuditSink`] emits leveled log lines: denies and test
//! namespace bypasses at `info`, routine allows at `debug`, and internal
//! connections at `trace`. [`JsonLinesAuditSink`] appends one JSON object per
//! decision to a file. Secrets never appear in any event.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::ConnectionContext;
use crate::core::Operation;
use crate::core::Origin;
use crate::core::Verdict;
use crate::interfaces::AuditSink;
use crate::runtime::rules::AccessRequest;
use crate::runtime::rules::Decision;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Log target used for audit lines.
pub const AUDIT_LOG_TARGET: &str = "karakara_gate::audit";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Authorization decision audit payload.
#[derive(Debug, Clone, Serialize)]
pub struct AccessAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Connection origin.
    pub origin: Origin,
    /// Transport address when known.
    pub address: Option<String>,
    /// Identity when presented.
    pub identity: Option<String>,
    /// Topic path as presented.
    pub topic: String,
    /// Requested operation, absent when the access mask names none.
    pub operation: Option<Operation>,
    /// Broker access mask as presented.
    pub access_mask: u8,
    /// Decision verdict.
    pub verdict: Verdict,
    /// Label of the rule that produced the verdict.
    pub rule: String,
    /// Whether the decision warrants a visible log line.
    pub notable: bool,
}

impl AccessAuditEvent {
    /// Builds an event from an evaluated request.
    #[must_use]
    pub fn new(request: &AccessRequest<'_>, address: Option<&str>, decision: &Decision) -> Self {
        Self {
            event: "topic_access",
            timestamp_ms: now_ms(),
            origin: request.origin,
            address: address.map(str::to_string),
            identity: request.identity.map(|identity| identity.as_str().to_string()),
            topic: request.topic.to_string(),
            operation: Some(request.operation),
            access_mask: request.operation.access_mask(),
            verdict: decision.verdict,
            rule: decision.rule.clone(),
            notable: decision.notable,
        }
    }

    /// Builds an event for an access mask that names no known operation.
    #[must_use]
    pub fn unknown_operation(
        connection: &ConnectionContext,
        access_mask: u8,
        topic: &str,
        decision: &Decision,
    ) -> Self {
        Self {
            event: "topic_access",
            timestamp_ms: now_ms(),
            origin: connection.origin(),
            address: connection.address().map(str::to_string),
            identity: connection.identity().map(|identity| identity.as_str().to_string()),
            topic: topic.to_string(),
            operation: None,
            access_mask,
            verdict: decision.verdict,
            rule: decision.rule.clone(),
            notable: decision.notable,
        }
    }
}

/// Reason a credential check resolved the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialReason {
    /// Trusted origin; the authority was not consulted.
    TrustedOrigin,
    /// Identity or secret absent on a gateway connection.
    MissingCredentials,
    /// Legacy test credential bypass matched.
    LegacyTestBypass,
    /// Authority answered HTTP 200.
    AuthorityAccepted,
    /// Authority answered a non-200 status.
    AuthorityRejected,
    /// Authority exchange failed or timed out.
    AuthorityUnavailable,
}

impl CredentialReason {
    /// Returns the audit label for the reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TrustedOrigin => "trusted_origin",
            Self::MissingCredentials => "missing_credentials",
            Self::LegacyTestBypass => "legacy_test_bypass",
            Self::AuthorityAccepted => "authority_accepted",
            Self::AuthorityRejected => "authority_rejected",
            Self::AuthorityUnavailable => "authority_unavailable",
        }
    }
}

/// Credential check audit payload.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Connection origin.
    pub origin: Origin,
    /// Transport address when known.
    pub address: Option<String>,
    /// Identity when presented.
    pub identity: Option<String>,
    /// Decision verdict.
    pub verdict: Verdict,
    /// Decision reason.
    pub reason: CredentialReason,
    /// Authority response status when one was received.
    pub status: Option<u16>,
}

impl CredentialAuditEvent {
    /// Builds an event for a connection's credential check.
    #[must_use]
    pub fn new(
        connection: &ConnectionContext,
        verdict: Verdict,
        reason: CredentialReason,
        status: Option<u16>,
    ) -> Self {
        Self {
            event: "credential_check",
            timestamp_ms: now_ms(),
            origin: connection.origin(),
            address: connection.address().map(str::to_string),
            identity: connection.identity().map(|identity| identity.as_str().to_string()),
            verdict,
            reason,
            status,
        }
    }
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Emits an access event through a `tracing` level macro.
macro_rules! trace_access {
    ($level:ident, $event:ident) => {
        tracing::$level!(
            target: AUDIT_LOG_TARGET,
            origin = $event.origin.as_str(),
            address = $event.address.as_deref().unwrap_or("-"),
            identity = $event.identity.as_deref().unwrap_or("-"),
            topic = %$event.topic,
            operation = $event.operation.map_or("unknown", Operation::as_str),
            access_mask = $event.access_mask,
            verdict = $event.verdict.as_str(),
            rule = %$event.rule,
            "topic access decision"
        )
    };
}

/// Emits a credential event through a `tracing` level macro.
macro_rules! trace_credentials {
    ($level:ident, $event:ident) => {
        tracing::$level!(
            target: AUDIT_LOG_TARGET,
            origin = $event.origin.as_str(),
            address = $event.address.as_deref().unwrap_or("-"),
            identity = $event.identity.as_deref().unwrap_or("-"),
            verdict = $event.verdict.as_str(),
            reason = $event.reason.as_str(),
            status = $event.status.unwrap_or(0),
            "credential check decision"
        )
    };
}

/// Audit sink that routes events to `tracing`.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record_access(&self, event: &AccessAuditEvent) {
        if event.origin == Origin::Internal {
            trace_access!(trace, event);
        } else if event.notable {
            trace_access!(info, event);
        } else {
            trace_access!(debug, event);
        }
    }

    fn record_credentials(&self, event: &CredentialAuditEvent) {
        match event.reason {
            CredentialReason::TrustedOrigin => trace_credentials!(debug, event),
            CredentialReason::AuthorityUnavailable => trace_credentials!(warn, event),
            CredentialReason::MissingCredentials
            | CredentialReason::LegacyTestBypass
            | CredentialReason::AuthorityAccepted
            | CredentialReason::AuthorityRejected => trace_credentials!(info, event),
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct JsonLinesAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl JsonLinesAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Serializes and appends one event.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl AuditSink for JsonLinesAuditSink {
    fn record_access(&self, event: &AccessAuditEvent) {
        self.append(event);
    }

    fn record_credentials(&self, event: &CredentialAuditEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_access(&self, _event: &AccessAuditEvent) {}

    fn record_credentials(&self, _event: &CredentialAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Milliseconds since the Unix epoch, zero if the clock is before it.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}
