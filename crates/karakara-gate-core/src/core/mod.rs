// crates/karakara-gate-core/src/core/mod.rs
// ============================================================================
// Module: Karakara Gate Core Types
// Description: Identities, connection facts, topics, operations and verdicts.
// Purpose: Provide the stable vocabulary shared by every gate component.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Core types carry no decision logic beyond origin classification and topic
//! prefix predicates. Rule evaluation lives in [`crate::runtime`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod connection;
pub mod decision;
pub mod identifiers;
pub mod topic;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use connection::ConnectionContext;
pub use connection::Origin;
pub use connection::ProtocolKind;
pub use connection::classify;
pub use decision::ACCESS_READ;
pub use decision::ACCESS_SUBSCRIBE;
pub use decision::ACCESS_WRITE;
pub use decision::Operation;
pub use decision::Verdict;
pub use identifiers::Identity;
pub use identifiers::Secret;
pub use topic::PrefixMatch;
pub use topic::TopicPath;
pub use topic::has_prefix;
pub use topic::has_segment_prefix;
