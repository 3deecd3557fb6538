// crates/karakara-gate-server/src/lib.rs
// ============================================================================
// Module: Karakara Gate Server Library
// Description: HTTP auth service for broker auth plugins.
// Purpose: Answer broker credential and ACL checks over HTTP.
// Dependencies: karakara-gate-core, karakara-gate-config, axum, tokio
// ============================================================================

//! ## Overview
//! [`GateServer`] wraps an [`karakara_gate_core::AuthGate`] in an axum router
//! so a broker auth plugin can delegate its checks over loopback HTTP.
//! Invariants:
//! - Allow answers 200; deny answers 403; unusable requests answer 400.
//! - Response bodies never carry a deny reason.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use server::AclCheckRequest;
pub use server::CheckResponse;
pub use server::GateServer;
pub use server::GateServerError;
pub use server::UserCheckRequest;
pub use server::build_gate;
