// crates/karakara-gate-config/src/config.rs
// ============================================================================
// Module: Karakara Gate Configuration
// Description: Configuration loading and validation for Karakara Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: karakara-gate-core, karakara-gate-verifier, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional; omitted values take built-in defaults. Invalid
//! configuration fails closed.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use karakara_gate_core::Identity;
use karakara_gate_core::PrefixMatch;
use karakara_gate_core::RulePolicy;
use karakara_gate_core::TestNamespaces;
use karakara_gate_core::core::topic::TOPIC_SEPARATOR;
use karakara_gate_core::core::topic::contains_wildcard;
use karakara_gate_core::runtime::rules::DEFAULT_ANONYMOUS_PLACEHOLDER;
use karakara_gate_core::runtime::rules::DEFAULT_PRIVATE_TEST_PREFIX;
use karakara_gate_core::runtime::rules::DEFAULT_PUBLIC_TEST_PREFIX;
use karakara_gate_core::runtime::rules::DEFAULT_ROOM_ROOT;
use karakara_gate_core::runtime::rules::DEFAULT_TEST_IDENTITY;
use karakara_gate_verifier::CredentialTransport;
use karakara_gate_verifier::DEFAULT_ENDPOINT;
use karakara_gate_verifier::DEFAULT_TIMEOUT_MS;
use karakara_gate_verifier::DEFAULT_USER_AGENT;
use karakara_gate_verifier::HttpVerifierConfig;
use karakara_gate_verifier::parse_endpoint;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "karakara-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "KARAKARA_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum identity authority timeout in milliseconds.
pub(crate) const MIN_TIMEOUT_MS: u64 = 100;
/// Maximum identity authority timeout in milliseconds.
pub(crate) const MAX_TIMEOUT_MS: u64 = 60_000;
/// Default HTTP service bind address.
pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:8765";
/// Default maximum HTTP request body size.
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Karakara Gate configuration root.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Identity authority settings.
    #[serde(default)]
    pub identity_authority: IdentityAuthorityConfig,
    /// Topic rule settings.
    #[serde(default)]
    pub rules: RulesConfig,
    /// HTTP auth service settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Decision audit settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl GateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then [`CONFIG_ENV_VAR`], then
    /// [`DEFAULT_CONFIG_NAME`]. A missing default file yields built-in
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = env::var(CONFIG_ENV_VAR).ok();
        let source = resolve_path(path, env_path.as_deref())?;
        validate_path(source.path())?;
        let config = match fs::read(source.path()) {
            Ok(bytes) => Self::from_bytes(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound && !source.is_explicit() => {
                tracing::info!(
                    path = %source.path().display(),
                    "config file not found; using built-in defaults"
                );
                let config = Self::default();
                config.validate()?;
                config
            }
            Err(err) => return Err(ConfigError::Io(err.to_string())),
        };
        if config.identity_authority.endpoint.is_none() {
            tracing::info!(
                endpoint = DEFAULT_ENDPOINT,
                "identity authority endpoint not configured; using default"
            );
        }
        Ok(config)
    }

    /// Parses and validates configuration from raw file bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the content is oversized, not UTF-8, not
    /// valid TOML, or fails validation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.identity_authority.validate()?;
        self.rules.validate()?;
        self.server.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Returns the rule policy described by the `[rules]` section.
    #[must_use]
    pub fn rule_policy(&self) -> RulePolicy {
        self.rules.to_policy()
    }

    /// Returns the identity authority client settings.
    #[must_use]
    pub fn verifier_config(&self) -> HttpVerifierConfig {
        self.identity_authority.to_verifier_config()
    }
}

// ============================================================================
// SECTION: Identity Authority
// ============================================================================

/// Identity authority settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityAuthorityConfig {
    /// Authority endpoint; the built-in default applies when omitted.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Credential transmission mode.
    #[serde(default)]
    pub transport: CredentialTransport,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// User agent header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Admit gateway credentials whose identity or secret equals `test`.
    #[serde(default)]
    pub legacy_test_bypass: bool,
}

impl Default for IdentityAuthorityConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            transport: CredentialTransport::Form,
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            legacy_test_bypass: false,
        }
    }
}

impl IdentityAuthorityConfig {
    /// Returns the effective endpoint.
    #[must_use]
    pub fn effective_endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    /// Builds identity authority client settings.
    #[must_use]
    pub fn to_verifier_config(&self) -> HttpVerifierConfig {
        HttpVerifierConfig {
            endpoint: self.effective_endpoint().to_string(),
            transport: self.transport,
            timeout: Duration::from_millis(self.timeout_ms),
            user_agent: self.user_agent.clone(),
        }
    }

    /// Validates identity authority settings.
    fn validate(&self) -> Result<(), ConfigError> {
        parse_endpoint(self.effective_endpoint()).map_err(|err| {
            ConfigError::Invalid(format!("identity_authority.endpoint: {err}"))
        })?;
        if !(MIN_TIMEOUT_MS ..= MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "identity_authority.timeout_ms must be between {MIN_TIMEOUT_MS} and \
                 {MAX_TIMEOUT_MS}"
            )));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "identity_authority.user_agent must be non-empty".to_string(),
            ));
        }
        if self.legacy_test_bypass {
            tracing::warn!("identity_authority.legacy_test_bypass is enabled");
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Topic rule settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// Root of the per-identity room namespace.
    #[serde(default = "default_room_root")]
    pub room_root: String,
    /// Identity substituted for anonymous callers.
    #[serde(default = "default_anonymous_placeholder")]
    pub anonymous_placeholder: String,
    /// Prefix matching policy.
    #[serde(default)]
    pub room_match: PrefixMatch,
    /// Whether the test namespace rules are installed.
    #[serde(default = "default_true")]
    pub test_namespaces: bool,
    /// Namespace open to every caller.
    #[serde(default = "default_public_test_prefix")]
    pub public_test_prefix: String,
    /// Namespace open only to `test_identity`.
    #[serde(default = "default_private_test_prefix")]
    pub private_test_prefix: String,
    /// Identity admitted to the private test namespace.
    #[serde(default = "default_test_identity")]
    pub test_identity: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            room_root: default_room_root(),
            anonymous_placeholder: default_anonymous_placeholder(),
            room_match: PrefixMatch::Literal,
            test_namespaces: true,
            public_test_prefix: default_public_test_prefix(),
            private_test_prefix: default_private_test_prefix(),
            test_identity: default_test_identity(),
        }
    }
}

impl RulesConfig {
    /// Builds the rule policy.
    #[must_use]
    pub fn to_policy(&self) -> RulePolicy {
        let test_namespaces = self.test_namespaces.then(|| TestNamespaces {
            public_prefix: self.public_test_prefix.clone(),
            private_prefix: self.private_test_prefix.clone(),
            identity: Identity::new(self.test_identity.clone()),
        });
        RulePolicy {
            room_root: self.room_root.clone(),
            anonymous_placeholder: self.anonymous_placeholder.clone(),
            prefix_match: self.room_match,
            test_namespaces,
        }
    }

    /// Validates rule settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_prefix("rules.room_root", &self.room_root)?;
        if self.anonymous_placeholder.is_empty() {
            return Err(ConfigError::Invalid(
                "rules.anonymous_placeholder must be non-empty".to_string(),
            ));
        }
        if self.anonymous_placeholder.contains(TOPIC_SEPARATOR)
            || contains_wildcard(&self.anonymous_placeholder)
        {
            return Err(ConfigError::Invalid(
                "rules.anonymous_placeholder must be a single topic level".to_string(),
            ));
        }
        if self.test_namespaces {
            validate_prefix("rules.public_test_prefix", &self.public_test_prefix)?;
            validate_prefix("rules.private_test_prefix", &self.private_test_prefix)?;
            if self.test_identity.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "rules.test_identity must be non-empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP auth service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the bind address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid server.bind address".to_string()))
    }

    /// Validates server settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be greater than zero".to_string(),
            ));
        }
        let addr = self.bind_addr()?;
        if !addr.ip().is_loopback() {
            tracing::warn!(bind = %addr, "auth service bound to a non-loopback address");
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// Leveled `tracing` log lines.
    #[default]
    Log,
    /// Append-only JSON lines file.
    Jsonl,
    /// Discard audit events.
    None,
}

/// Decision audit settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// Output path for the `jsonl` sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, self.path.as_deref()) {
            (AuditSinkKind::Jsonl, None) => {
                Err(ConfigError::Invalid("audit.sink=jsonl requires audit.path".to_string()))
            }
            (_, Some(path)) => validate_path_string("audit.path", path),
            (AuditSinkKind::Log | AuditSinkKind::None, None) => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolved configuration path and how it was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConfigSource {
    /// Path given on the command line or through the environment.
    Explicit(PathBuf),
    /// Default file name in the working directory.
    Default(PathBuf),
}

impl ConfigSource {
    /// Returns the resolved path.
    pub(crate) fn path(&self) -> &Path {
        match self {
            Self::Explicit(path) | Self::Default(path) => path,
        }
    }

    /// Returns true when the path was requested explicitly.
    pub(crate) const fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit(_))
    }
}

/// Resolves the config path from CLI or environment defaults.
pub(crate) fn resolve_path(
    path: Option<&Path>,
    env_path: Option<&str>,
) -> Result<ConfigSource, ConfigError> {
    if let Some(path) = path {
        return Ok(ConfigSource::Explicit(path.to_path_buf()));
    }
    if let Some(env_path) = env_path {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(ConfigSource::Explicit(PathBuf::from(env_path)));
    }
    Ok(ConfigSource::Default(PathBuf::from(DEFAULT_CONFIG_NAME)))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Validates a namespace prefix.
fn validate_prefix(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if !value.ends_with(TOPIC_SEPARATOR) {
        return Err(ConfigError::Invalid(format!("{field} must end with '/'")));
    }
    if contains_wildcard(value) {
        return Err(ConfigError::Invalid(format!("{field} must not contain wildcards")));
    }
    Ok(())
}

/// Default identity authority timeout.
const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Default identity authority user agent.
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

/// Default room namespace root.
fn default_room_root() -> String {
    DEFAULT_ROOM_ROOT.to_string()
}

/// Default anonymous placeholder.
fn default_anonymous_placeholder() -> String {
    DEFAULT_ANONYMOUS_PLACEHOLDER.to_string()
}

/// Default public test prefix.
fn default_public_test_prefix() -> String {
    DEFAULT_PUBLIC_TEST_PREFIX.to_string()
}

/// Default private test prefix.
fn default_private_test_prefix() -> String {
    DEFAULT_PRIVATE_TEST_PREFIX.to_string()
}

/// Default test identity.
fn default_test_identity() -> String {
    DEFAULT_TEST_IDENTITY.to_string()
}

/// Serde helper for boolean fields defaulting to true.
const fn default_true() -> bool {
    true
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use unwraps for clarity."
    )]

    use std::path::Path;

    use super::ConfigSource;
    use super::DEFAULT_CONFIG_NAME;
    use super::resolve_path;
    use super::validate_prefix;

    #[test]
    fn explicit_path_wins_over_environment() {
        let source = resolve_path(Some(Path::new("cli.toml")), Some("env.toml")).unwrap();
        assert_eq!(source, ConfigSource::Explicit("cli.toml".into()));
    }

    #[test]
    fn environment_path_is_explicit() {
        let source = resolve_path(None, Some("env.toml")).unwrap();
        assert!(source.is_explicit());
        assert_eq!(source.path(), Path::new("env.toml"));
    }

    #[test]
    fn default_name_is_last_resort() {
        let source = resolve_path(None, None).unwrap();
        assert!(!source.is_explicit());
        assert_eq!(source.path(), Path::new(DEFAULT_CONFIG_NAME));
    }

    #[test]
    fn prefixes_must_be_plain_namespaces() {
        assert!(validate_prefix("f", "karakara/room/").is_ok());
        assert!(validate_prefix("f", "").is_err());
        assert!(validate_prefix("f", "karakara/room").is_err());
        assert!(validate_prefix("f", "karakara/+/").is_err());
        assert!(validate_prefix("f", "karakara/#/").is_err());
    }
}
