// crates/karakara-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Karakara Gate Runtime
// Description: Rule evaluation and the broker-facing gate.
// Purpose: Turn connection facts and requests into verdicts.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! Rule evaluation and the broker-facing gate.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod gate;
pub mod rules;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use gate::AuthGate;
pub use gate::LEGACY_TEST_CREDENTIAL;
pub use rules::AccessRequest;
pub use rules::DEFAULT_RULE_LABEL;
pub use rules::Decision;
pub use rules::Rule;
pub use rules::RulePolicy;
pub use rules::RulePredicate;
pub use rules::RuleTable;
pub use rules::TestNamespaces;
