//! Local HTTP listener for the OAuth redirect.
//!
//! Binds a fixed loopback port, serves one meaningful `GET /callback`, and
//! hands the result to its owner over a single-use slot. Dropping the
//! listener stops the server and releases the port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::error::{OAuthError, Result};
use crate::oauth::CALLBACK_PATH;

/// How long [`CallbackListener::shutdown`] waits for in-flight requests.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// What the browser redirect delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Code(String),
    Error(CallbackError),
}

/// Why the callback did not produce a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    /// `state` did not match the nonce issued for this attempt.
    StateMismatch,
    /// The provider reported an error (for example the user denied consent).
    Provider {
        error: String,
        description: Option<String>,
    },
    /// Redirect arrived without a `code` parameter.
    MissingCode,
    /// The listener itself failed.
    Server(String),
}

impl std::fmt::Display for CallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackError::StateMismatch => write!(f, "invalid state parameter"),
            CallbackError::Provider {
                error,
                description: Some(description),
            } => write!(f, "authorization error: {} - {}", error, description),
            CallbackError::Provider { error, .. } => write!(f, "authorization error: {}", error),
            CallbackError::MissingCode => write!(f, "no authorization code received"),
            CallbackError::Server(msg) => write!(f, "callback server error: {}", msg),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Shared state for the callback handler.
struct CallbackState {
    expected_state: String,
    slot: Mutex<Option<oneshot::Sender<CallbackOutcome>>>,
}

impl CallbackState {
    fn new(expected_state: String) -> (Arc<Self>, oneshot::Receiver<CallbackOutcome>) {
        let (tx, rx) = oneshot::channel();
        let state = Arc::new(Self {
            expected_state,
            slot: Mutex::new(Some(tx)),
        });
        (state, rx)
    }

    async fn deliver(&self, outcome: CallbackOutcome) -> bool {
        match self.slot.lock().await.take() {
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }
}

fn router(state: Arc<CallbackState>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(handle_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A running callback listener.
#[derive(Debug)]
pub struct CallbackListener {
    local_addr: SocketAddr,
    outcome: Option<oneshot::Receiver<CallbackOutcome>>,
    shutdown: CancellationToken,
    server: Option<JoinHandle<()>>,
}

impl CallbackListener {
    /// Bind `addr` and start serving. An occupied port fails immediately.
    pub async fn bind(addr: SocketAddr, expected_state: impl Into<String>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                OAuthError::PortInUse {
                    port: addr.port(),
                    message: e.to_string(),
                }
            } else {
                OAuthError::Callback(format!("Failed to bind {}: {}", addr, e))
            }
        })?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| OAuthError::Callback(e.to_string()))?;

        let (state, rx) = CallbackState::new(expected_state.into());
        let app = router(state.clone());
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();

        tracing::info!(addr = %local_addr, "Starting OAuth callback listener");
        let server = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "OAuth callback listener failed");
                state
                    .deliver(CallbackOutcome::Error(CallbackError::Server(e.to_string())))
                    .await;
            }
            tracing::debug!("OAuth callback listener stopped");
        });

        Ok(Self {
            local_addr,
            outcome: Some(rx),
            shutdown,
            server: Some(server),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the callback outcome. Safe to drop mid-wait and call again.
    pub async fn recv(&mut self) -> CallbackOutcome {
        let Some(rx) = self.outcome.as_mut() else {
            return CallbackOutcome::Error(CallbackError::Server(
                "callback outcome already consumed".to_string(),
            ));
        };
        let result = rx.await;
        self.outcome = None;
        result.unwrap_or_else(|_| {
            CallbackOutcome::Error(CallbackError::Server(
                "listener stopped before a callback arrived".to_string(),
            ))
        })
    }

    /// Stop accepting connections and wait for the port to be released.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(mut server) = self.server.take() {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
                tracing::warn!("Callback listener did not stop in time, aborting");
                server.abort();
                let _ = server.await;
            }
        }
    }
}

impl Drop for CallbackListener {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Handle GET /callback
async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let (outcome, response) = evaluate(&state.expected_state, params);

    if !state.deliver(outcome).await {
        return (
            StatusCode::GONE,
            Html(page(
                "Authorization Already Handled",
                "This authorization attempt has already completed.",
            )),
        )
            .into_response();
    }

    response
}

fn evaluate(expected_state: &str, params: CallbackParams) -> (CallbackOutcome, Response) {
    if params.state.as_deref() != Some(expected_state) {
        tracing::warn!("OAuth callback with mismatched state");
        return (
            CallbackOutcome::Error(CallbackError::StateMismatch),
            (StatusCode::BAD_REQUEST, "Invalid state").into_response(),
        );
    }

    if let Some(error) = params.error.filter(|e| !e.is_empty()) {
        let description = params.error_description.filter(|d| !d.is_empty());
        tracing::warn!(error = %error, "Provider reported authorization error");
        let detail = description.clone().unwrap_or_else(|| error.clone());
        let body = page("Authorization Failed", &detail);
        return (
            CallbackOutcome::Error(CallbackError::Provider { error, description }),
            (StatusCode::BAD_REQUEST, Html(body)).into_response(),
        );
    }

    match params.code.filter(|c| !c.is_empty()) {
        Some(code) => (
            CallbackOutcome::Code(code),
            Html(page("Authorization Successful!", "You can close this window.")).into_response(),
        ),
        None => (
            CallbackOutcome::Error(CallbackError::MissingCode),
            (StatusCode::BAD_REQUEST, "No code received").into_response(),
        ),
    }
}

fn page(title: &str, message: &str) -> String {
    format!(
        "<html><body><h1>{}</h1><p>{}</p>\
         <script>setTimeout(function(){{window.close();}},3000);</script></body></html>",
        html_escape::encode_text(title),
        html_escape::encode_text(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn call(app: Router, query: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/callback?{}", query))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_valid_code() {
        let (state, rx) = CallbackState::new("expected".to_string());
        let (status, body) = call(router(state), "code=abc&state=expected").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Authorization Successful"));
        assert_eq!(rx.await.unwrap(), CallbackOutcome::Code("abc".to_string()));
    }

    #[tokio::test]
    async fn test_state_mismatch_never_yields_code() {
        let (state, rx) = CallbackState::new("expected".to_string());
        let (status, _) = call(router(state), "code=abc&state=forged").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            rx.await.unwrap(),
            CallbackOutcome::Error(CallbackError::StateMismatch)
        );
    }

    #[tokio::test]
    async fn test_missing_state_is_mismatch() {
        let (state, rx) = CallbackState::new("expected".to_string());
        let (status, _) = call(router(state), "code=abc").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            rx.await.unwrap(),
            CallbackOutcome::Error(CallbackError::StateMismatch)
        );
    }

    #[tokio::test]
    async fn test_provider_error_is_escaped() {
        let (state, rx) = CallbackState::new("s".to_string());
        let (status, body) = call(
            router(state),
            "state=s&error=access_denied&error_description=%3Cb%3Enope%3C%2Fb%3E",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("&lt;b&gt;nope&lt;/b&gt;"));
        assert!(!body.contains("<b>"));
        assert_eq!(
            rx.await.unwrap(),
            CallbackOutcome::Error(CallbackError::Provider {
                error: "access_denied".to_string(),
                description: Some("<b>nope</b>".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_missing_code() {
        let (state, rx) = CallbackState::new("s".to_string());
        let (status, _) = call(router(state), "state=s").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            rx.await.unwrap(),
            CallbackOutcome::Error(CallbackError::MissingCode)
        );
    }

    #[tokio::test]
    async fn test_second_request_is_gone() {
        let (state, _rx) = CallbackState::new("s".to_string());
        let app = router(state);

        let (first, _) = call(app.clone(), "code=one&state=s").await;
        let (second, _) = call(app, "code=two&state=s").await;
        assert_eq!(first, StatusCode::OK);
        assert_eq!(second, StatusCode::GONE);
    }

    #[tokio::test]
    async fn test_port_in_use_fails_fast() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = occupied.local_addr().unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            CallbackListener::bind(addr, "s"),
        )
        .await
        .expect("bind should not block");

        match result {
            Err(OAuthError::PortInUse { port, .. }) => assert_eq!(port, addr.port()),
            other => panic!("expected PortInUse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_listener_round_trip_releases_port() {
        let mut listener = CallbackListener::bind("127.0.0.1:0".parse().unwrap(), "s")
            .await
            .unwrap();
        let addr = listener.local_addr();

        let response = reqwest::get(format!("http://{}/callback?code=xyz&state=s", addr))
            .await
            .unwrap();
        assert!(response.status().is_success());

        assert_eq!(listener.recv().await, CallbackOutcome::Code("xyz".to_string()));
        listener.shutdown().await;

        std::net::TcpListener::bind(addr).expect("port released after shutdown");
    }
}
