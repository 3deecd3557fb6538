// crates/karakara-gate-verifier/tests/http_verifier.rs
// ============================================================================
// Module: HTTP Verifier Tests
// Description: Identity authority exchanges against a local HTTP server.
// Purpose: Pin status mapping, credential encoding and fail-closed transport.
// Dependencies: karakara-gate-verifier, karakara-gate-core, tiny_http, tokio
// ============================================================================

//! HTTP identity verifier behavior against a scripted authority.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::net::TcpListener;
use std::thread::JoinHandle;
use std::time::Duration;

use karakara_gate_core::CredentialVerifier;
use karakara_gate_core::Identity;
use karakara_gate_core::Secret;
use karakara_gate_core::VerificationOutcome;
use karakara_gate_verifier::CredentialTransport;
use karakara_gate_verifier::HttpIdentityVerifier;
use karakara_gate_verifier::HttpVerifierConfig;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// Request facts captured by the scripted authority.
#[derive(Debug)]
struct Captured {
    /// HTTP method.
    method: String,
    /// Request target including query.
    url: String,
    /// Request body.
    body: String,
    /// Content-Type header value.
    content_type: Option<String>,
}

/// Serves one request with `status` and returns what was received.
fn serve_once(status: u16, extra: Option<Header>) -> (String, JoinHandle<Captured>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/auth/verify", server.server_addr());
    let handle = std::thread::spawn(move || {
        let mut request = server.recv().unwrap();
        let mut body = String::new();
        request.as_reader().read_to_string(&mut body).unwrap();
        let content_type = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Content-Type"))
            .map(|header| header.value.as_str().to_string());
        let captured = Captured {
            method: request.method().to_string(),
            url: request.url().to_string(),
            body,
            content_type,
        };
        let mut response = Response::from_string("").with_status_code(status);
        if let Some(header) = extra {
            response = response.with_header(header);
        }
        request.respond(response).unwrap();
        captured
    });
    (endpoint, handle)
}

fn verifier(endpoint: &str, transport: CredentialTransport) -> HttpIdentityVerifier {
    HttpIdentityVerifier::new(&HttpVerifierConfig {
        endpoint: endpoint.to_string(),
        transport,
        timeout: Duration::from_secs(5),
        ..HttpVerifierConfig::default()
    })
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn status_200_accepts() {
    let (endpoint, handle) = serve_once(200, None);
    let outcome = verifier(&endpoint, CredentialTransport::Form)
        .verify(&Identity::new("alice"), &Secret::new("hunter2"))
        .await;
    assert_eq!(
        outcome,
        VerificationOutcome::Accepted {
            status: 200
        }
    );
    let captured = handle.join().unwrap();
    assert_eq!(captured.method, "POST");
    assert_eq!(captured.url, "/auth/verify");
    assert_eq!(captured.body, "username=alice&password=hunter2");
    assert_eq!(captured.content_type.as_deref(), Some("application/x-www-form-urlencoded"));
}

#[tokio::test(flavor = "multi_thread")]
async fn status_403_rejects() {
    let (endpoint, handle) = serve_once(403, None);
    let outcome = verifier(&endpoint, CredentialTransport::Form)
        .verify(&Identity::new("alice"), &Secret::new("wrongpass"))
        .await;
    assert_eq!(
        outcome,
        VerificationOutcome::Rejected {
            status: 403
        }
    );
    handle.join().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn other_success_codes_reject() {
    let (endpoint, handle) = serve_once(204, None);
    let outcome = verifier(&endpoint, CredentialTransport::Form)
        .verify(&Identity::new("alice"), &Secret::new("pw"))
        .await;
    assert_eq!(
        outcome,
        VerificationOutcome::Rejected {
            status: 204
        }
    );
    handle.join().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn redirects_are_not_followed() {
    let location = Header::from_bytes("Location", "http://127.0.0.1:1/elsewhere").unwrap();
    let (endpoint, handle) = serve_once(302, Some(location));
    let outcome = verifier(&endpoint, CredentialTransport::Form)
        .verify(&Identity::new("alice"), &Secret::new("pw"))
        .await;
    assert_eq!(
        outcome,
        VerificationOutcome::Rejected {
            status: 302
        }
    );
    handle.join().unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn form_body_escapes_reserved_characters() {
    let (endpoint, handle) = serve_once(200, None);
    let _ = verifier(&endpoint, CredentialTransport::Form)
        .verify(&Identity::new("al ice&x=1"), &Secret::new("p@ss/#?"))
        .await;
    let captured = handle.join().unwrap();
    assert_eq!(captured.body, "username=al+ice%26x%3D1&password=p%40ss%2F%23%3F");
}

#[tokio::test(flavor = "multi_thread")]
async fn query_transport_sends_get_with_escaped_pairs() {
    let (endpoint, handle) = serve_once(200, None);
    let outcome = verifier(&endpoint, CredentialTransport::Query)
        .verify(&Identity::new("alice"), &Secret::new("a&b"))
        .await;
    assert_eq!(
        outcome,
        VerificationOutcome::Accepted {
            status: 200
        }
    );
    let captured = handle.join().unwrap();
    assert_eq!(captured.method, "GET");
    assert_eq!(captured.url, "/auth/verify?username=alice&password=a%26b");
    assert!(captured.body.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_authority_is_unavailable() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let endpoint = format!("http://127.0.0.1:{port}/auth/verify");
    let outcome = verifier(&endpoint, CredentialTransport::Form)
        .verify(&Identity::new("alice"), &Secret::new("pw"))
        .await;
    assert_eq!(outcome, VerificationOutcome::Unavailable);
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_authority_times_out_as_unavailable() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let endpoint = format!("http://{}/auth/verify", server.server_addr());
    let handle = std::thread::spawn(move || {
        if let Ok(request) = server.recv() {
            std::thread::sleep(Duration::from_millis(600));
            let _ = request.respond(Response::from_string("late"));
        }
    });
    let verifier = HttpIdentityVerifier::new(&HttpVerifierConfig {
        endpoint,
        timeout: Duration::from_millis(150),
        ..HttpVerifierConfig::default()
    })
    .unwrap();
    let outcome = verifier.verify(&Identity::new("alice"), &Secret::new("pw")).await;
    assert_eq!(outcome, VerificationOutcome::Unavailable);
    handle.join().unwrap();
}

#[test]
fn invalid_endpoints_fail_construction() {
    for endpoint in ["file:///etc/passwd", "http://u:p@host/verify", ""] {
        let result = HttpIdentityVerifier::new(&HttpVerifierConfig {
            endpoint: endpoint.to_string(),
            ..HttpVerifierConfig::default()
        });
        assert!(result.is_err(), "{endpoint} should be rejected");
    }
}
