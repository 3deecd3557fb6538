// crates/karakara-gate-verifier/src/http.rs
// ============================================================================
// Module: HTTP Identity Verifier
// Description: Identity authority client for gateway credential checks.
// Purpose: Exchange one escaped identity/secret pair for an HTTP status.
// Dependencies: karakara-gate-core, reqwest, url, tracing
// ============================================================================

//! ## Overview
//! [`HttpIdentityVerifier`] sends one request per credential check to the
//! configured identity authority and maps the response status to a
//! [`VerificationOutcome`]. Only HTTP 200 is accepted.
//! Invariants:
//! - Redirects are never followed; a 3xx answer is a rejection.
//! - Every request is bounded by the configured timeout.
//! - Transport failures resolve to [`VerificationOutcome::Unavailable`].
//! - No retries and no caching.
//! - The secret never reaches a log line, including transport error text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use karakara_gate_core::CredentialVerifier;
use karakara_gate_core::Identity;
use karakara_gate_core::Secret;
use karakara_gate_core::VerificationOutcome;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use url::Url;
use url::form_urlencoded;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Identity authority endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:6543/auth/verify";
/// Default request timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// Default user agent sent to the identity authority.
pub const DEFAULT_USER_AGENT: &str = concat!("karakara-gate/", env!("CARGO_PKG_VERSION"));
/// Form field carrying the identity.
const USERNAME_FIELD: &str = "username";
/// Form field carrying the secret.
const PASSWORD_FIELD: &str = "password";
/// Content type of form-encoded request bodies.
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// How credentials are transmitted to the identity authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialTransport {
    /// `POST` with a form-encoded body.
    #[default]
    Form,
    /// `GET` with the credentials in the query string.
    Query,
}

impl CredentialTransport {
    /// Returns the configuration label for the transport.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Form => "form",
            Self::Query => "query",
        }
    }
}

/// Settings for [`HttpIdentityVerifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpVerifierConfig {
    /// Identity authority endpoint.
    pub endpoint: String,
    /// Credential transmission mode.
    pub transport: CredentialTransport,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User agent header value.
    pub user_agent: String,
}

impl Default for HttpVerifierConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            transport: CredentialTransport::Form,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identity authority client errors.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// The endpoint is not a usable http(s) URL.
    #[error("invalid identity authority endpoint: {0}")]
    InvalidEndpoint(String),
    /// The HTTP client could not be constructed.
    #[error("identity authority client build failed: {0}")]
    Build(String),
    /// The exchange could not be completed.
    #[error("identity authority transport failed: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Identity authority client.
///
/// # Invariants
/// - The endpoint is parsed once at construction and never mutated.
/// - Redirects are rejected.
#[derive(Debug, Clone)]
pub struct HttpIdentityVerifier {
    /// HTTP client with timeout and redirect policy applied.
    client: Client,
    /// Parsed authority endpoint.
    endpoint: Url,
    /// Credential transmission mode.
    transport: CredentialTransport,
}

impl HttpIdentityVerifier {
    /// Builds a verifier for the configured authority.
    ///
    /// # Errors
    ///
    /// Returns [`VerifierError`] when the endpoint is invalid or the HTTP
    /// client cannot be constructed.
    pub fn new(config: &HttpVerifierConfig) -> Result<Self, VerifierError> {
        let endpoint = parse_endpoint(&config.endpoint)?;
        let client = Client::builder()
            .redirect(Policy::none())
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|err| VerifierError::Build(err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            transport: config.transport,
        })
    }

    /// Returns the configured endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the configured transport.
    #[must_use]
    pub const fn transport(&self) -> CredentialTransport {
        self.transport
    }

    /// Performs one exchange and returns the response status.
    async fn exchange(
        &self,
        identity: &Identity,
        secret: &Secret,
    ) -> Result<StatusCode, VerifierError> {
        let request = match self.transport {
            CredentialTransport::Form => self
                .client
                .post(self.endpoint.clone())
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(encode_credentials(identity, secret)),
            CredentialTransport::Query => {
                let mut url = self.endpoint.clone();
                url.query_pairs_mut()
                    .append_pair(USERNAME_FIELD, identity.as_str())
                    .append_pair(PASSWORD_FIELD, secret.expose());
                self.client.get(url)
            }
        };
        let response = request
            .send()
            .await
            .map_err(|err| VerifierError::Transport(err.without_url().to_string()))?;
        Ok(response.status())
    }
}

#[async_trait]
impl CredentialVerifier for HttpIdentityVerifier {
    async fn verify(&self, identity: &Identity, secret: &Secret) -> VerificationOutcome {
        match self.exchange(identity, secret).await {
            Ok(status) if status == StatusCode::OK => VerificationOutcome::Accepted {
                status: status.as_u16(),
            },
            Ok(status) => {
                tracing::debug!(
                    identity = identity.as_str(),
                    status = status.as_u16(),
                    "identity authority rejected credentials"
                );
                VerificationOutcome::Rejected {
                    status: status.as_u16(),
                }
            }
            Err(err) => {
                tracing::warn!(
                    identity = identity.as_str(),
                    error = %err,
                    "identity authority unavailable"
                );
                VerificationOutcome::Unavailable
            }
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses and checks an authority endpoint.
///
/// # Errors
///
/// Returns [`VerifierError::InvalidEndpoint`] for unparseable URLs, non-http(s)
/// schemes, missing hosts and embedded credentials.
pub fn parse_endpoint(raw: &str) -> Result<Url, VerifierError> {
    let url = Url::parse(raw).map_err(|err| VerifierError::InvalidEndpoint(err.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(VerifierError::InvalidEndpoint(format!("unsupported scheme: {scheme}")));
        }
    }
    if url.host().is_none() {
        return Err(VerifierError::InvalidEndpoint("missing host".to_string()));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(VerifierError::InvalidEndpoint("embedded credentials".to_string()));
    }
    Ok(url)
}

/// Form-encodes the credential pair.
#[must_use]
pub fn encode_credentials(identity: &Identity, secret: &Secret) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair(USERNAME_FIELD, identity.as_str())
        .append_pair(PASSWORD_FIELD, secret.expose())
        .finish()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
