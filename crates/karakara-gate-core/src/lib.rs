// crates/karakara-gate-core/src/lib.rs
// ============================================================================
// Module: Karakara Gate Core Library
// Description: Connection classification, topic rules and credential gating.
// Purpose: Decide who may connect to the karakara broker and what they may do.
// Dependencies: async-trait, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! Karakara Gate decides, for a publish/subscribe broker, which connections
//! may log in and which topic operations they may perform.
//! Invariants:
//! - Connections from internal or raw wire-protocol origins are trusted and
//!   never consult the identity authority.
//! - Gateway connections must present an identity and a secret, and are
//!   admitted only when the authority answers HTTP 200.
//! - Topic authorization is a first-match rule table terminated by a default
//!   deny.
//! - Secrets never appear in audit output.
//!
//! Security posture: every broker input is untrusted; verification failures
//! deny.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AccessAuditEvent;
pub use audit::CredentialAuditEvent;
pub use audit::CredentialReason;
pub use audit::JsonLinesAuditSink;
pub use audit::NoopAuditSink;
pub use audit::TracingAuditSink;
pub use crate::core::ConnectionContext;
pub use crate::core::Identity;
pub use crate::core::Operation;
pub use crate::core::Origin;
pub use crate::core::PrefixMatch;
pub use crate::core::ProtocolKind;
pub use crate::core::Secret;
pub use crate::core::Verdict;
pub use crate::core::classify;
pub use interfaces::AuditSink;
pub use interfaces::CredentialVerifier;
pub use interfaces::VerificationOutcome;
pub use runtime::AccessRequest;
pub use runtime::AuthGate;
pub use runtime::Decision;
pub use runtime::Rule;
pub use runtime::RulePolicy;
pub use runtime::RulePredicate;
pub use runtime::RuleTable;
pub use runtime::TestNamespaces;
