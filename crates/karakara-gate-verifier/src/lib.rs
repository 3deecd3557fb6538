// crates/karakara-gate-verifier/src/lib.rs
// ============================================================================
// Module: Karakara Gate Verifier Library
// Description: HTTP identity authority client.
// Purpose: Verify gateway credentials against an external authority.
// Dependencies: karakara-gate-core, reqwest, url
// ============================================================================

//! ## Overview
//! Provides [`HttpIdentityVerifier`], the production
//! [`karakara_gate_core::CredentialVerifier`].
//! Invariants:
//! - Only HTTP 200 accepts.
//! - Every failure resolves to a non-accepting outcome.
//!
//! Security posture: the authority endpoint is configuration; responses are
//! trusted only for their status code.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use http::CredentialTransport;
pub use http::DEFAULT_ENDPOINT;
pub use http::DEFAULT_TIMEOUT_MS;
pub use http::DEFAULT_USER_AGENT;
pub use http::HttpIdentityVerifier;
pub use http::HttpVerifierConfig;
pub use http::VerifierError;
pub use http::encode_credentials;
pub use http::parse_endpoint;
