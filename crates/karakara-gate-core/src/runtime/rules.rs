// crates/karakara-gate-core/src/runtime/rules.rs
// ============================================================================
// Module: Authorization Rule Table
// Description: Ordered first-match rules for topic operation authorization.
// Purpose: Map (origin, identity, operation, topic) to exactly one verdict.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! A [`RuleTable`] is an ordered list of predicate/verdict pairs evaluated in
//! declaration order; the first matching rule decides. The terminal
//! default-deny is not part of the editable list, so every evaluation yields a
//! verdict and unmatched requests are always denied.
//!
//! [`RuleTable::standard`] builds the room-scoped table:
//! 1. internal origin, allow
//! 2. raw wire-protocol origin, allow
//! 3. subscribe, allow
//! 4. public test namespace, allow
//! 5. test identity in private test namespace, allow
//! 6. caller's own room, allow
//! 7. read under the room broadcast root, allow
//! 8. default, deny
//!
//! Evaluation is pure: identical requests always produce identical decisions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::Identity;
use crate::core::Operation;
use crate::core::Origin;
use crate::core::PrefixMatch;
use crate::core::Verdict;
use crate::core::topic::TOPIC_SEPARATOR;
use crate::core::topic::is_plain_segment;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Label reported when no rule matched.
pub const DEFAULT_RULE_LABEL: &str = "default";
/// Default root of the per-identity room namespace.
pub const DEFAULT_ROOM_ROOT: &str = "karakara/room/";
/// Default identity substituted for anonymous callers.
pub const DEFAULT_ANONYMOUS_PLACEHOLDER: &str = "[null]";
/// Default public test namespace.
pub const DEFAULT_PUBLIC_TEST_PREFIX: &str = "test/public/";
/// Default private test namespace.
pub const DEFAULT_PRIVATE_TEST_PREFIX: &str = "test/private/";
/// Default identity allowed into the private test namespace.
pub const DEFAULT_TEST_IDENTITY: &str = "test";

// ============================================================================
// SECTION: Requests & Decisions
// ============================================================================

/// Authorization request evaluated against a rule table.
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    /// Connection origin.
    pub origin: Origin,
    /// Identity, absent for anonymous callers.
    pub identity: Option<&'a Identity>,
    /// Requested operation.
    pub operation: Operation,
    /// Topic path as presented by the broker.
    pub topic: &'a str,
}

impl<'a> AccessRequest<'a> {
    /// Creates a new access request.
    #[must_use]
    pub const fn new(
        origin: Origin,
        identity: Option<&'a Identity>,
        operation: Operation,
        topic: &'a str,
    ) -> Self {
        Self {
            origin,
            identity,
            operation,
            topic,
        }
    }
}

/// Result of evaluating a rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Verdict of the matching rule.
    pub verdict: Verdict,
    /// Label of the matching rule.
    pub rule: String,
    /// True for denies and rules flagged as notable.
    pub notable: bool,
}

// ============================================================================
// SECTION: Predicates
// ============================================================================

/// Match condition of a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulePredicate {
    /// Connection origin equals the given origin.
    OriginIs(Origin),
    /// Operation equals the given operation.
    OperationIs(Operation),
    /// Topic lies under the prefix.
    TopicUnder {
        /// Namespace prefix.
        prefix: String,
    },
    /// Identity equals `identity` and topic lies under the prefix.
    IdentityTopicUnder {
        /// Required identity.
        identity: Identity,
        /// Namespace prefix.
        prefix: String,
    },
    /// Topic lies under `<room_root><identity>/`.
    OwnRoom {
        /// Room namespace root.
        room_root: String,
        /// Identity used when the caller is anonymous.
        anonymous_placeholder: String,
    },
    /// Operation equals `operation` and topic lies under the prefix.
    OperationTopicUnder {
        /// Required operation.
        operation: Operation,
        /// Namespace prefix.
        prefix: String,
    },
}

impl RulePredicate {
    /// Returns true when the predicate holds for the request.
    fn matches(&self, request: &AccessRequest<'_>, prefix_match: PrefixMatch) -> bool {
        match self {
            Self::OriginIs(origin) => request.origin == *origin,
            Self::OperationIs(operation) => request.operation == *operation,
            Self::TopicUnder {
                prefix,
            } => prefix_match.matches(request.topic, prefix),
            Self::IdentityTopicUnder {
                identity,
                prefix,
            } => {
                request.identity == Some(identity) && prefix_match.matches(request.topic, prefix)
            }
            Self::OwnRoom {
                room_root,
                anonymous_placeholder,
            } => {
                let owner = request
                    .identity
                    .map_or(anonymous_placeholder.as_str(), Identity::as_str);
                if prefix_match == PrefixMatch::Segment && !is_plain_segment(owner) {
                    return false;
                }
                let room = own_room_prefix(room_root, owner);
                prefix_match.matches(request.topic, &room)
            }
            Self::OperationTopicUnder {
                operation,
                prefix,
            } => request.operation == *operation && prefix_match.matches(request.topic, prefix),
        }
    }
}

/// Builds the literal own-room prefix `<room_root>/<owner>/`.
#[must_use]
pub fn own_room_prefix(room_root: &str, owner: &str) -> String {
    let root = room_root.trim_end_matches(TOPIC_SEPARATOR);
    let mut prefix = String::with_capacity(root.len() + owner.len() + 2);
    prefix.push_str(root);
    prefix.push(TOPIC_SEPARATOR);
    prefix.push_str(owner);
    prefix.push(TOPIC_SEPARATOR);
    prefix
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Ordered predicate/verdict pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Audit label for the rule.
    pub label: String,
    /// Match condition.
    pub predicate: RulePredicate,
    /// Verdict returned when the predicate matches.
    pub verdict: Verdict,
    /// Whether a match should be logged visibly.
    pub notable: bool,
}

impl Rule {
    /// Creates an allow rule.
    #[must_use]
    pub fn allow(label: impl Into<String>, predicate: RulePredicate) -> Self {
        Self {
            label: label.into(),
            predicate,
            verdict: Verdict::Allow,
            notable: false,
        }
    }

    /// Creates a deny rule.
    #[must_use]
    pub fn deny(label: impl Into<String>, predicate: RulePredicate) -> Self {
        Self {
            label: label.into(),
            predicate,
            verdict: Verdict::Deny,
            notable: true,
        }
    }

    /// Marks matches of this rule as notable.
    #[must_use]
    pub const fn notable(mut self) -> Self {
        self.notable = true;
        self
    }

    /// Decision produced when this rule matches.
    fn decision(&self) -> Decision {
        Decision {
            verdict: self.verdict,
            rule: self.label.clone(),
            notable: self.notable || self.verdict == Verdict::Deny,
        }
    }
}

/// Decision produced when no rule matches.
fn default_decision() -> Decision {
    Decision {
        verdict: Verdict::Deny,
        rule: DEFAULT_RULE_LABEL.to_string(),
        notable: true,
    }
}

// ============================================================================
// SECTION: Rule Policy
// ============================================================================

/// Test namespace affordances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNamespaces {
    /// Namespace open to every caller.
    pub public_prefix: String,
    /// Namespace open only to `identity`.
    pub private_prefix: String,
    /// Identity admitted to the private namespace.
    pub identity: Identity,
}

impl Default for TestNamespaces {
    fn default() -> Self {
        Self {
            public_prefix: DEFAULT_PUBLIC_TEST_PREFIX.to_string(),
            private_prefix: DEFAULT_PRIVATE_TEST_PREFIX.to_string(),
            identity: Identity::new(DEFAULT_TEST_IDENTITY),
        }
    }
}

/// Inputs for the standard room-scoped rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePolicy {
    /// Root of the per-identity room namespace; also the broadcast root.
    pub room_root: String,
    /// Identity substituted for anonymous callers.
    pub anonymous_placeholder: String,
    /// Prefix matching policy.
    pub prefix_match: PrefixMatch,
    /// Test namespace affordances, if enabled.
    pub test_namespaces: Option<TestNamespaces>,
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self {
            room_root: DEFAULT_ROOM_ROOT.to_string(),
            anonymous_placeholder: DEFAULT_ANONYMOUS_PLACEHOLDER.to_string(),
            prefix_match: PrefixMatch::Literal,
            test_namespaces: Some(TestNamespaces::default()),
        }
    }
}

// ============================================================================
// SECTION: Rule Table
// ============================================================================

/// Ordered rule list with a structural default deny.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    /// Rules in evaluation order.
    rules: Vec<Rule>,
    /// Prefix matching policy for topic predicates.
    prefix_match: PrefixMatch,
}

impl RuleTable {
    /// Creates an empty table; every request is denied until rules are added.
    #[must_use]
    pub const fn new(prefix_match: PrefixMatch) -> Self {
        Self {
            rules: Vec::new(),
            prefix_match,
        }
    }

    /// Builds the standard room-scoped rule table.
    #[must_use]
    pub fn standard(policy: &RulePolicy) -> Self {
        let mut table = Self::new(policy.prefix_match)
            .with_rule(Rule::allow("internal_origin", RulePredicate::OriginIs(Origin::Internal)))
            .with_rule(Rule::allow(
                "raw_trusted_origin",
                RulePredicate::OriginIs(Origin::RawTrusted),
            ))
            .with_rule(Rule::allow("subscribe", RulePredicate::OperationIs(Operation::Subscribe)));
        if let Some(test) = &policy.test_namespaces {
            table = table
                .with_rule(
                    Rule::allow(
                        "public_test",
                        RulePredicate::TopicUnder {
                            prefix: test.public_prefix.clone(),
                        },
                    )
                    .notable(),
                )
                .with_rule(
                    Rule::allow(
                        "private_test",
                        RulePredicate::IdentityTopicUnder {
                            identity: test.identity.clone(),
                            prefix: test.private_prefix.clone(),
                        },
                    )
                    .notable(),
                );
        }
        table
            .with_rule(Rule::allow(
                "own_room",
                RulePredicate::OwnRoom {
                    room_root: policy.room_root.clone(),
                    anonymous_placeholder: policy.anonymous_placeholder.clone(),
                },
            ))
            .with_rule(Rule::allow(
                "room_broadcast_read",
                RulePredicate::OperationTopicUnder {
                    operation: Operation::Read,
                    prefix: policy.room_root.clone(),
                },
            ))
    }

    /// Appends a rule ahead of the default deny.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.push(rule);
        self
    }

    /// Appends a rule ahead of the default deny.
    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Returns the rules in evaluation order, excluding the default deny.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the prefix matching policy.
    #[must_use]
    pub const fn prefix_match(&self) -> PrefixMatch {
        self.prefix_match
    }

    /// Evaluates the request; the first matching rule decides.
    #[must_use]
    pub fn evaluate(&self, request: &AccessRequest<'_>) -> Decision {
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(request, self.prefix_match))
            .map_or_else(default_decision, Rule::decision)
    }

    /// Evaluates a request whose access mask names no known operation.
    ///
    /// Only origin rules can match; everything else reaches the default deny.
    #[must_use]
    pub fn evaluate_unknown_operation(&self, origin: Origin) -> Decision {
        self.rules
            .iter()
            .find(|rule| {
                matches!(rule.predicate, RulePredicate::OriginIs(expected) if expected == origin)
            })
            .map_or_else(default_decision, Rule::decision)
    }

    /// Evaluates the request and returns only the verdict.
    #[must_use]
    pub fn authorize(
        &self,
        identity: Option<&Identity>,
        origin: Origin,
        operation: Operation,
        topic: &str,
    ) -> Verdict {
        self.evaluate(&AccessRequest::new(origin, identity, operation, topic)).verdict
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
