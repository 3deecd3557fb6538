// crates/karakara-gate-server/tests/common/mod.rs
// ============================================================================
// Module: Common Test Utilities
// Description: Shared helpers for karakara-gate-server tests.
// Purpose: Spawn a stub identity authority and a live auth service.
// Dependencies: karakara-gate-server, karakara-gate-config, tiny_http, tokio
// ============================================================================

//! ## Overview
//! Provides a `tiny_http` identity authority that accepts one fixed
//! credential pair and a helper that runs the auth service on an ephemeral
//! loopback port.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use karakara_gate_config::GateConfig;
use karakara_gate_server::GateServer;
use tiny_http::Response;
use tiny_http::Server;
use tokio::net::TcpListener;

/// Form body the stub authority accepts.
pub const ACCEPTED_BODY: &str = "username=alice&password=hunter2";

/// Stub identity authority handle.
pub struct StubAuthority {
    /// Endpoint URL of the stub.
    pub endpoint: String,
    /// Number of requests served.
    pub calls: Arc<AtomicUsize>,
}

impl StubAuthority {
    /// Returns the number of requests served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Starts an authority answering 200 for [`ACCEPTED_BODY`] and 403 otherwise.
pub fn spawn_authority() -> StubAuthority {
    let server = Server::http("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/auth/verify", server.server_addr());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    std::thread::spawn(move || {
        for mut request in server.incoming_requests() {
            counter.fetch_add(1, Ordering::SeqCst);
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            let status = if body == ACCEPTED_BODY { 200 } else { 403 };
            let _ = request.respond(Response::from_string("").with_status_code(status));
        }
    });
    StubAuthority {
        endpoint,
        calls,
    }
}

/// Builds a config pointing at `endpoint` with `extra` TOML appended.
pub fn config_for(endpoint: &str, extra: &str) -> GateConfig {
    let toml = format!(
        "[identity_authority]\nendpoint = \"{endpoint}\"\ntimeout_ms = 2000\n\n[audit]\nsink = \
         \"none\"\n\n{extra}"
    );
    GateConfig::from_bytes(toml.as_bytes()).unwrap()
}

/// Runs the auth service on an ephemeral port and returns its base URL.
pub async fn spawn_service(config: &GateConfig) -> String {
    let server = GateServer::from_config(config).unwrap();
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.serve_with_listener(listener).await;
    });
    format!("http://{addr}")
}
