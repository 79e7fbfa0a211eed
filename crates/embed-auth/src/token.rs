//! OAuth client-credentials exchange
//!
//! First upstream call of the pipeline. POSTs the client-credentials
//! grant to the platform's token endpoint with the client pair as HTTP
//! Basic credentials and hands back the short-lived access token.
//! Nothing is cached or refreshed: one exchange per incoming request,
//! and the token is spent immediately on the embed authorization.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::debug;

use common::{Secret, body_snippet, truncate_id};

use crate::error::{Error, Result};

/// Path of the client-credentials token endpoint, relative to the
/// platform base URL.
pub const TOKEN_PATH: &str = "/oauth/token";

/// Access token identifying the backend service to the platform.
///
/// Lives for one request. Redacted in Debug output; consumed by
/// [`authorize_embed`](crate::embed::authorize_embed) so it cannot be
/// reused after the embed token has been issued.
#[derive(Debug)]
pub struct AccessToken(Secret<String>);

impl AccessToken {
    pub fn new(value: String) -> Self {
        Self(Secret::new(value))
    }

    /// Raw bearer value for the Authorization header.
    pub fn expose(&self) -> &str {
        self.0.expose()
    }
}

/// Success shape of the token endpoint. Only `access_token` matters:
/// the token is used once, immediately, so `expires_in` is irrelevant.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Basic Authorization header value for the client pair.
///
/// Built explicitly so the encoding is auditable and testable in one
/// place. The secret never travels in the form body.
fn basic_credentials(client_id: &str, client_secret: &Secret<String>) -> String {
    let pair = format!("{client_id}:{}", client_secret.expose());
    format!("Basic {}", STANDARD.encode(pair))
}

/// Exchange client credentials for a short-lived access token.
///
/// A single attempt per request: upstream failures are surfaced, not
/// retried. The form carries only the grant type and scope.
pub async fn exchange_client_credentials(
    client: &reqwest::Client,
    base_url: &str,
    client_id: &str,
    client_secret: &Secret<String>,
    scope: &str,
) -> Result<AccessToken> {
    let url = format!("{base_url}{TOKEN_PATH}");

    let response = client
        .post(&url)
        .header(
            reqwest::header::AUTHORIZATION,
            basic_credentials(client_id, client_secret),
        )
        .form(&[("grant_type", "client_credentials"), ("scope", scope)])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        debug!(
            status = status.as_u16(),
            body = %body_snippet(&body),
            "token endpoint rejected exchange"
        );
        return Err(Error::TokenRejected {
            status: status.as_u16(),
            client_id_hint: truncate_id(client_id),
        });
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| Error::InvalidResponse(format!("token response: {e}")))?;

    match body.access_token {
        Some(token) if !token.is_empty() => Ok(AccessToken::new(token)),
        _ => Err(Error::TokenMissing {
            client_id_hint: truncate_id(client_id),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{StatusCode, header};

    use super::*;

    struct Captured {
        authorization: String,
        path: String,
        body: String,
    }

    /// Start a stub token endpoint that records the request it receives
    /// and answers with a fixed status and body.
    async fn start_token_stub(
        status: StatusCode,
        body: &'static str,
    ) -> (String, Arc<Mutex<Option<Captured>>>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured: Arc<Mutex<Option<Captured>>> = Arc::new(Mutex::new(None));
        let captured_in = captured.clone();

        tokio::spawn(async move {
            let app = axum::Router::new().fallback(
                move |request: axum::http::Request<Body>| {
                    let captured = captured_in.clone();
                    async move {
                        let authorization = request
                            .headers()
                            .get(header::AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("")
                            .to_string();
                        let path = request.uri().path().to_string();
                        let bytes = axum::body::to_bytes(request.into_body(), 1024 * 1024)
                            .await
                            .unwrap();
                        *captured.lock().unwrap() = Some(Captured {
                            authorization,
                            path,
                            body: String::from_utf8_lossy(&bytes).to_string(),
                        });
                        (
                            status,
                            [(header::CONTENT_TYPE, "application/json")],
                            body,
                        )
                    }
                },
            );
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), captured)
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone)]
    struct LogSink(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogSink {
        type Writer = LogSink;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn exchange_sends_basic_auth_and_grant_form() {
        let (base_url, captured) =
            start_token_stub(StatusCode::OK, r#"{"access_token":"at-123"}"#).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = reqwest::Client::new();
        let secret = Secret::new(String::from("s3cret"));
        let token = exchange_client_credentials(
            &client,
            &base_url,
            "embed-service",
            &secret,
            "data audit user dashboard",
        )
        .await
        .unwrap();

        assert_eq!(token.expose(), "at-123");

        let captured = captured.lock().unwrap();
        let captured = captured.as_ref().unwrap();
        assert_eq!(captured.path, TOKEN_PATH);
        assert_eq!(
            captured.authorization,
            format!("Basic {}", STANDARD.encode("embed-service:s3cret"))
        );
        assert!(
            captured.body.contains("grant_type=client_credentials"),
            "got body: {}",
            captured.body
        );
        assert!(
            captured.body.contains("scope=data+audit+user+dashboard"),
            "got body: {}",
            captured.body
        );
        // The secret rides in the Basic header, never the form body
        assert!(!captured.body.contains("s3cret"));
    }

    #[tokio::test]
    async fn exchange_maps_rejection_to_status_and_hint() {
        let (base_url, _captured) =
            start_token_stub(StatusCode::UNAUTHORIZED, r#"{"error":"invalid_client"}"#).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = reqwest::Client::new();
        let secret = Secret::new(String::from("wrong"));
        let err = exchange_client_credentials(
            &client,
            &base_url,
            "embed-service-client-id",
            &secret,
            "data",
        )
        .await
        .unwrap_err();

        match err {
            Error::TokenRejected {
                status,
                ref client_id_hint,
            } => {
                assert_eq!(status, 401);
                assert!(!client_id_hint.contains("embed-service-client-id"));
                assert!(client_id_hint.starts_with("embed-se"));
            }
            other => panic!("expected TokenRejected, got {other:?}"),
        }
        // Neither the secret nor the full client id leaks through Display
        let text = err.to_string();
        assert!(!text.contains("wrong"));
        assert!(!text.contains("embed-service-client-id"));
    }

    #[tokio::test]
    async fn rejection_logs_a_bounded_body_snippet() {
        let huge = format!(
            r#"{{"error":"server_error","detail":"{}"}}"#,
            "x".repeat(256 * 1024)
        );
        let rejection: &'static str = Box::leak(huge.into_boxed_str());
        let (base_url, _captured) = start_token_stub(StatusCode::BAD_GATEWAY, rejection).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let sink: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(LogSink(sink.clone()))
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let client = reqwest::Client::new();
        let secret = Secret::new(String::from("s"));
        let err = exchange_client_credentials(&client, &base_url, "id", &secret, "data")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TokenRejected { .. }), "got {err:?}");

        let captured = sink.lock().unwrap();
        let logged = String::from_utf8_lossy(&captured);
        // The snippet head survives; the quarter-megabyte tail does not
        assert!(logged.contains("server_error"), "got: {logged}");
        assert!(
            captured.len() < 16 * 1024,
            "rejection log grew with the upstream body: {} bytes",
            captured.len()
        );
    }

    #[tokio::test]
    async fn exchange_requires_access_token_field() {
        let (base_url, _captured) =
            start_token_stub(StatusCode::OK, r#"{"token_type":"bearer"}"#).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = reqwest::Client::new();
        let secret = Secret::new(String::from("s"));
        let err = exchange_client_credentials(&client, &base_url, "id", &secret, "data")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TokenMissing { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn exchange_rejects_empty_access_token() {
        let (base_url, _captured) =
            start_token_stub(StatusCode::OK, r#"{"access_token":""}"#).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = reqwest::Client::new();
        let secret = Secret::new(String::from("s"));
        let err = exchange_client_credentials(&client, &base_url, "id", &secret, "data")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TokenMissing { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn exchange_flags_unparseable_success_body() {
        let (base_url, _captured) = start_token_stub(StatusCode::OK, "not json at all").await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = reqwest::Client::new();
        let secret = Secret::new(String::from("s"));
        let err = exchange_client_credentials(&client, &base_url, "id", &secret, "data")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn exchange_maps_connection_failure_to_http() {
        // Nothing listens on port 1
        let client = reqwest::Client::new();
        let secret = Secret::new(String::from("s"));
        let err =
            exchange_client_credentials(&client, "http://127.0.0.1:1", "id", &secret, "data")
                .await
                .unwrap_err();
        assert!(matches!(err, Error::Http(_)), "got {err:?}");
    }

    #[test]
    fn basic_credentials_encode_the_pair() {
        let secret = Secret::new(String::from("open-sesame"));
        assert_eq!(
            basic_credentials("svc", &secret),
            format!("Basic {}", STANDARD.encode("svc:open-sesame"))
        );
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new(String::from("at-very-secret"));
        let debug = format!("{token:?}");
        assert!(!debug.contains("at-very-secret"), "got: {debug}");
    }
}
