// crates/karakara-gate-server/src/server.rs
// ============================================================================
// Module: Auth Service
// Description: HTTP endpoints answering broker credential and ACL checks.
// Purpose: Expose the gate to broker auth plugins over loopback HTTP.
// Dependencies: karakara-gate-core, karakara-gate-config, axum, tokio
// ============================================================================

//! ## Overview
//! The auth service is stateless: the broker plugin supplies the connection
//! facts (address and protocol) on every call, and each call builds a fresh
//! [`ConnectionContext`].
//!
//! Routes:
//! - `POST /auth/user`: credential check, 200 on allow, 403 on deny.
//! - `POST /auth/acl`: topic operation check, 200 on allow, 403 on deny.
//! - `GET /health`: liveness.
//!
//! Trusted origins pass every ACL check, including access masks that name no
//! known operation; gateway checks with such masks are denied.
//! Oversized or malformed bodies answer 400. Responses never say why a check
//! was denied. Security posture: request bodies are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::routing::get;
use axum::routing::post;
use karakara_gate_config::AuditSinkKind;
use karakara_gate_config::GateConfig;
use karakara_gate_core::AuditSink;
use karakara_gate_core::AuthGate;
use karakara_gate_core::ConnectionContext;
use karakara_gate_core::Identity;
use karakara_gate_core::JsonLinesAuditSink;
use karakara_gate_core::NoopAuditSink;
use karakara_gate_core::ProtocolKind;
use karakara_gate_core::RuleTable;
use karakara_gate_core::Secret;
use karakara_gate_core::TracingAuditSink;
use karakara_gate_core::Verdict;
use karakara_gate_verifier::HttpIdentityVerifier;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;

// ============================================================================
// SECTION: Gate Assembly
// ============================================================================

/// Builds the gate described by a validated configuration.
///
/// # Errors
///
/// Returns [`GateServerError`] when the verifier or audit sink cannot be
/// constructed.
pub fn build_gate(config: &GateConfig) -> Result<AuthGate, GateServerError> {
    let verifier = HttpIdentityVerifier::new(&config.verifier_config())
        .map_err(|err| GateServerError::Init(err.to_string()))?;
    let audit = build_audit_sink(config)?;
    let rules = RuleTable::standard(&config.rule_policy());
    Ok(AuthGate::new(rules, Arc::new(verifier), audit)
        .with_legacy_test_bypass(config.identity_authority.legacy_test_bypass))
}

/// Builds the configured audit sink.
fn build_audit_sink(config: &GateConfig) -> Result<Arc<dyn AuditSink>, GateServerError> {
    match config.audit.sink {
        AuditSinkKind::Log => Ok(Arc::new(TracingAuditSink)),
        AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkKind::Jsonl => {
            let path = config.audit.path.as_deref().ok_or_else(|| {
                GateServerError::Config("audit.sink=jsonl requires audit.path".to_string())
            })?;
            let sink = JsonLinesAuditSink::new(Path::new(path))
                .map_err(|err| GateServerError::Init(format!("audit log open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP auth service instance.
pub struct GateServer {
    /// Shared handler state.
    state: Arc<ServerState>,
    /// Configured bind address.
    bind: SocketAddr,
}

/// Shared state for request handlers.
struct ServerState {
    /// Authorization gate.
    gate: AuthGate,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
}

impl GateServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GateServerError`] when validation or initialization fails.
    pub fn from_config(config: &GateConfig) -> Result<Self, GateServerError> {
        config.validate().map_err(|err| GateServerError::Config(err.to_string()))?;
        let gate = build_gate(config)?;
        let bind =
            config.server.bind_addr().map_err(|err| GateServerError::Config(err.to_string()))?;
        Ok(Self::new(gate, bind, config.server.max_body_bytes))
    }

    /// Builds a server around an existing gate.
    #[must_use]
    pub fn new(gate: AuthGate, bind: SocketAddr, max_body_bytes: usize) -> Self {
        Self {
            state: Arc::new(ServerState {
                gate,
                max_body_bytes,
            }),
            bind,
        }
    }

    /// Returns the configured bind address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Returns the HTTP router.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/auth/user", post(handle_user))
            .route("/auth/acl", post(handle_acl))
            .route("/health", get(handle_health))
            .layer(DefaultBodyLimit::max(self.state.max_body_bytes))
            .with_state(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`GateServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), GateServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|err| GateServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_with_listener(listener).await
    }

    /// Serves on an already bound listener until interrupted.
    ///
    /// # Errors
    ///
    /// Returns [`GateServerError::Transport`] when serving fails.
    pub async fn serve_with_listener(self, listener: TcpListener) -> Result<(), GateServerError> {
        let local = listener
            .local_addr()
            .map_err(|err| GateServerError::Transport(format!("http bind failed: {err}")))?;
        tracing::info!(bind = %local, "karakara gate auth service listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|err| GateServerError::Transport(format!("http server failed: {err}")))
    }
}

/// Resolves when the process receives an interrupt.
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("shutdown requested");
    } else {
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Credential check request from the broker plugin.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserCheckRequest {
    /// Presented identity.
    #[serde(default)]
    pub username: Option<String>,
    /// Presented secret.
    #[serde(default)]
    pub password: Option<String>,
    /// Client transport address; absent for internal connections.
    #[serde(default)]
    pub address: Option<String>,
    /// Client protocol.
    pub protocol: ProtocolKind,
}

/// Topic access request from the broker plugin.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AclCheckRequest {
    /// Connection identity.
    #[serde(default)]
    pub username: Option<String>,
    /// Topic path.
    pub topic: String,
    /// Broker access mask.
    pub acc: u8,
    /// Client transport address; absent for internal connections.
    #[serde(default)]
    pub address: Option<String>,
    /// Client protocol.
    pub protocol: ProtocolKind,
}

/// Response body for every route.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResponse {
    /// Whether the check passed.
    pub ok: bool,
}

/// Handler reply.
type Reply = (StatusCode, Json<CheckResponse>);

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `POST /auth/user`.
async fn handle_user(
    State(state): State<Arc<ServerState>>,
    body: Result<Bytes, BytesRejection>,
) -> Reply {
    let Some(request) = decode::<UserCheckRequest>(&state, body) else {
        return bad_request();
    };
    let connection = ConnectionContext::establish(
        request.address,
        request.protocol,
        request.username.map(Identity::new),
    );
    let secret = request.password.map(Secret::new);
    verdict_reply(state.gate.authenticate(&connection, secret.as_ref()).await)
}

/// Handles `POST /auth/acl`.
async fn handle_acl(
    State(state): State<Arc<ServerState>>,
    body: Result<Bytes, BytesRejection>,
) -> Reply {
    let Some(request) = decode::<AclCheckRequest>(&state, body) else {
        return bad_request();
    };
    let connection = ConnectionContext::establish(
        request.address,
        request.protocol,
        request.username.map(Identity::new),
    );
    verdict_reply(state.gate.authorize_access_mask(&connection, request.acc, &request.topic))
}

/// Handles `GET /health`.
async fn handle_health() -> Reply {
    (
        StatusCode::OK,
        Json(CheckResponse {
            ok: true,
        }),
    )
}

/// Decodes a bounded JSON body, or `None` for anything unusable.
fn decode<T: for<'de> Deserialize<'de>>(
    state: &ServerState,
    body: Result<Bytes, BytesRejection>,
) -> Option<T> {
    let bytes = body.ok()?;
    if bytes.len() > state.max_body_bytes {
        return None;
    }
    serde_json::from_slice(&bytes).ok()
}

/// Maps a verdict to a reply.
fn verdict_reply(verdict: Verdict) -> Reply {
    let status = if verdict.is_allow() { StatusCode::OK } else { StatusCode::FORBIDDEN };
    (
        status,
        Json(CheckResponse {
            ok: verdict.is_allow(),
        }),
    )
}

/// Reply for unusable requests.
fn bad_request() -> Reply {
    (
        StatusCode::BAD_REQUEST,
        Json(CheckResponse {
            ok: false,
        }),
    )
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Auth service errors.
#[derive(Debug, Error)]
pub enum GateServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
