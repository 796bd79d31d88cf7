//! Stub decryption gateway shared by the end-to-end tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use shroud::shroud_client::{Client, ClientConfig, DevEngineFactory, EngineFactory};
use shroud::shroud_core::network;

static PORT_COUNTER: AtomicU16 = AtomicU16::new(19300);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

pub const STUB_PUBLIC_KEY: &str = "0x7075626c69632d6b65792d666f722d7465737473";

/// How `/fhe-key` answers
#[derive(Debug, Clone)]
pub enum KeyMode {
    Ok,
    Status(u16),
    /// 200 with a body lacking `publicKey`
    Malformed,
    /// 500 on the first fetch, then Ok
    FailFirst,
}

/// How `/decrypt/:id` answers
#[derive(Debug, Clone)]
pub enum DecryptMode {
    /// Pending until the n-th poll, which returns the value
    ReadyAfter(usize, Value),
    Never,
    Reject(String),
    /// 503 until the n-th poll, which returns the value
    FlakyThenReady(usize, Value),
}

struct StubState {
    key_mode: KeyMode,
    key_delay: Duration,
    decrypt_mode: DecryptMode,
    key_fetches: AtomicUsize,
    polls: AtomicUsize,
    last_request_id: Mutex<Option<String>>,
}

async fn fhe_key(State(state): State<Arc<StubState>>) -> Response {
    let n = state.key_fetches.fetch_add(1, Ordering::SeqCst) + 1;
    tokio::time::sleep(state.key_delay).await;

    match &state.key_mode {
        KeyMode::Ok => key_body(),
        KeyMode::Status(code) => {
            let code = StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (code, "key unavailable").into_response()
        }
        KeyMode::Malformed => Json(json!({ "key": STUB_PUBLIC_KEY })).into_response(),
        KeyMode::FailFirst if n == 1 => {
            (StatusCode::INTERNAL_SERVER_ERROR, "warming up").into_response()
        }
        KeyMode::FailFirst => key_body(),
    }
}

fn key_body() -> Response {
    Json(json!({ "publicKey": STUB_PUBLIC_KEY, "publicKeyId": "stub-key-1" })).into_response()
}

async fn decrypt_status(
    State(state): State<Arc<StubState>>,
    Path(request_id): Path<String>,
) -> Response {
    let n = state.polls.fetch_add(1, Ordering::SeqCst) + 1;
    if let Ok(mut last) = state.last_request_id.lock() {
        *last = Some(request_id);
    }

    match &state.decrypt_mode {
        DecryptMode::ReadyAfter(ready_at, value) if n >= *ready_at => {
            Json(json!({ "status": "done", "value": value })).into_response()
        }
        DecryptMode::ReadyAfter(..) | DecryptMode::Never => {
            Json(json!({ "status": "pending" })).into_response()
        }
        DecryptMode::Reject(reason) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "status": "rejected", "reason": reason })),
        )
            .into_response(),
        DecryptMode::FlakyThenReady(ready_at, value) if n >= *ready_at => {
            Json(json!({ "value": value })).into_response()
        }
        DecryptMode::FlakyThenReady(..) => {
            (StatusCode::SERVICE_UNAVAILABLE, "try later").into_response()
        }
    }
}

/// Gateway stub served on a local port
pub struct StubGateway {
    pub url: String,
    state: Arc<StubState>,
    _shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl StubGateway {
    pub async fn start() -> Self {
        Self::with_modes(KeyMode::Ok, DecryptMode::Never, Duration::ZERO).await
    }

    pub async fn decrypting(mode: DecryptMode) -> Self {
        Self::with_modes(KeyMode::Ok, mode, Duration::ZERO).await
    }

    pub async fn with_modes(key_mode: KeyMode, decrypt_mode: DecryptMode, key_delay: Duration) -> Self {
        let state = Arc::new(StubState {
            key_mode,
            key_delay,
            decrypt_mode,
            key_fetches: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            last_request_id: Mutex::new(None),
        });

        let router = Router::new()
            .route("/fhe-key", get(fhe_key))
            .route("/decrypt/:request_id", get(decrypt_status))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let port = next_port();
        let addr: SocketAddr = ([127, 0, 0, 1], port).into();
        let listener = TcpListener::bind(addr).await.expect("Bind should succeed");

        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            url: format!("http://127.0.0.1:{}", port),
            state,
            _shutdown: Some(shutdown_tx),
        }
    }

    pub fn key_fetches(&self) -> usize {
        self.state.key_fetches.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.state.polls.load(Ordering::SeqCst)
    }

    /// Request id of the latest poll, as decoded by the router
    pub fn last_request_id(&self) -> Option<String> {
        self.state.last_request_id.lock().ok().and_then(|last| last.clone())
    }

    /// Client config for the localhost profile pointed at this stub
    pub fn config(&self) -> ClientConfig {
        let profile = network::lookup(network::LOCALHOST).expect("localhost is registered");
        ClientConfig::new(profile)
            .with_gateway(self.url.clone())
            .with_http_timeout(Duration::from_secs(2))
    }

    pub fn client(&self) -> Client<DevEngineFactory> {
        Client::new(self.config(), DevEngineFactory::default())
    }

    pub fn client_with<F: EngineFactory>(&self, factory: F) -> Client<F> {
        Client::new(self.config(), factory)
    }
}
