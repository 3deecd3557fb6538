// crates/karakara-gate-core/src/core/topic.rs
// ============================================================================
// Module: Topic Path Matching
// Description: Prefix predicates over the slash-delimited topic namespace.
// Purpose: Decide whether a topic lies under a namespace prefix.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Topic paths are matched byte-for-byte with no normalization: `..`, repeated
//! slashes and case are all significant. [`PrefixMatch::Literal`] is a plain
//! byte prefix test, so `karakara/room/ab` matches the prefix
//! `karakara/room/a`. [`PrefixMatch::Segment`] additionally requires the
//! match to end at a path separator.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Topic level separator.
pub const TOPIC_SEPARATOR: char = '/';
/// Single-level wildcard character.
pub const SINGLE_LEVEL_WILDCARD: char = '+';
/// Multi-level wildcard character.
pub const MULTI_LEVEL_WILDCARD: char = '#';

// ============================================================================
// SECTION: Topic Path
// ============================================================================

/// Topic path addressed by a broker operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicPath(String);

impl TopicPath {
    /// Creates a new topic path. The value is stored verbatim.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the topic path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TopicPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TopicPath {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Prefix Predicates
// ============================================================================

/// Returns true when `path` starts with `prefix`, compared byte-for-byte.
///
/// A shorter path never matches a longer prefix. The empty prefix matches
/// every path.
#[must_use]
pub fn has_prefix(path: &str, prefix: &str) -> bool {
    let path = path.as_bytes();
    let prefix = prefix.as_bytes();
    path.len() >= prefix.len() && &path[.. prefix.len()] == prefix
}

/// Returns true when `path` starts with `prefix` and the match ends at a
/// separator (or at the end of `path`).
#[must_use]
pub fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    if !has_prefix(path, prefix) {
        return false;
    }
    if prefix.is_empty() || prefix.ends_with(TOPIC_SEPARATOR) {
        return true;
    }
    matches!(path.as_bytes().get(prefix.len()), None | Some(b'/'))
}

/// Returns true when `value` can stand as exactly one topic level.
///
/// Empty values and values containing separators or wildcards are rejected.
#[must_use]
pub fn is_plain_segment(value: &str) -> bool {
    !value.is_empty()
        && !value.contains([TOPIC_SEPARATOR, SINGLE_LEVEL_WILDCARD, MULTI_LEVEL_WILDCARD])
}

/// Returns true when `value` contains a topic wildcard.
#[must_use]
pub fn contains_wildcard(value: &str) -> bool {
    value.contains([SINGLE_LEVEL_WILDCARD, MULTI_LEVEL_WILDCARD])
}

/// Prefix matching policy for namespace rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixMatch {
    /// Plain byte prefix comparison.
    #[default]
    Literal,
    /// Prefix must end on a topic level boundary.
    Segment,
}

impl PrefixMatch {
    /// Applies the policy to a path and prefix.
    #[must_use]
    pub fn matches(self, path: &str, prefix: &str) -> bool {
        match self {
            Self::Literal => has_prefix(path, prefix),
            Self::Segment => has_segment_prefix(path, prefix),
        }
    }

    /// Returns the configuration label for the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Segment => "segment",
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
